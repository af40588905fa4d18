// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Triggers: edge-triggered event filters, level-triggered state
//! predicates, and the `TriggerAction` that composes one or both of them
//! with an action to run when they're satisfied.

use crate::actions::Action;
use crate::event::{Event, JobState};
use crate::log::Log;
use crate::timestamp::Timestamp;
use crate::topic::{current_job, TopicName};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Edge-triggered: fires based on events observed within a window, not on
/// the log's current state.
pub trait EventFilter: Send + Sync + fmt::Debug {
    fn topic_names_to_subscribe(&self) -> Vec<TopicName>;

    /// Whether a single event matches this filter.
    fn apply(&self, event: &Event) -> bool;

    /// Whether the filter is active given the events observed, keyed by
    /// topic, within the current window. The default composition is
    /// active iff, for at least one subscribed topic, the *latest* event
    /// observed on that topic within the window matches.
    fn is_active(&self, events_by_topic: &HashMap<TopicName, Vec<Event>>) -> bool {
        self.topic_names_to_subscribe().iter().any(|topic| {
            events_by_topic
                .get(topic)
                .and_then(|events| events.last())
                .map(|event| self.apply(event))
                .unwrap_or(false)
        })
    }
}

/// Level-triggered: fires based on the log's state as of `high`, regardless
/// of which events landed in the window that woke the subscriber.
pub trait StatePredicate: Send + Sync + fmt::Debug {
    fn topic_names_to_query(&self) -> Vec<TopicName>;

    fn apply(&self, log: &dyn Log, low: Timestamp, high: Timestamp, current_job_name: &TopicName) -> bool;
}

/// Active when any of `job_names`'s latest observed event within the
/// window has a state in `on_states`.
#[derive(Debug, Clone)]
pub struct AnyJobStateEventFilter {
    pub job_names: Vec<TopicName>,
    pub on_states: Vec<JobState>,
}

impl EventFilter for AnyJobStateEventFilter {
    fn topic_names_to_subscribe(&self) -> Vec<TopicName> {
        self.job_names.clone()
    }

    fn apply(&self, event: &Event) -> bool {
        event.job_state().map(|s| self.on_states.contains(&s)).unwrap_or(false)
    }
}

/// Active iff every job in `job_names` (substituting `current_job_name` for
/// the `CURRENT_JOB` sentinel) has, as of `high`, a most recent event whose
/// state is in `on_states`.
#[derive(Debug, Clone)]
pub struct AllJobStatePredicate {
    pub job_names: Vec<TopicName>,
    pub on_states: Vec<JobState>,
}

impl StatePredicate for AllJobStatePredicate {
    fn topic_names_to_query(&self) -> Vec<TopicName> {
        self.job_names.clone()
    }

    fn apply(&self, log: &dyn Log, _low: Timestamp, high: Timestamp, current_job_name: &TopicName) -> bool {
        let sentinel = current_job();
        self.job_names.iter().all(|name| {
            let resolved = if *name == sentinel { current_job_name } else { name };
            match log.last_event(resolved, high) {
                Some(ev) => ev.job_state().map(|s| self.on_states.contains(&s)).unwrap_or(false),
                None => false,
            }
        })
    }
}

/// A filter and/or predicate paired with an action to execute when both
/// (whichever are present) are satisfied. At least one of `filter` /
/// `predicate` must be set.
#[derive(Clone)]
pub struct TriggerAction {
    pub filter: Option<Arc<dyn EventFilter>>,
    pub predicate: Option<Arc<dyn StatePredicate>>,
    pub action: Arc<dyn Action>,
}

impl fmt::Debug for TriggerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerAction")
            .field("filter", &self.filter.is_some())
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

impl TriggerAction {
    /// The union of topics the filter and predicate each want to subscribe
    /// to, deduplicated. This is what wakes the subscriber at all.
    pub fn topics_to_subscribe(&self) -> Vec<TopicName> {
        let mut topics: Vec<TopicName> = Vec::new();
        if let Some(f) = &self.filter {
            topics.extend(f.topic_names_to_subscribe());
        }
        if let Some(p) = &self.predicate {
            for t in p.topic_names_to_query() {
                if !topics.contains(&t) {
                    topics.push(t);
                }
            }
        }
        topics
    }

    pub fn is_active(
        &self,
        events_by_topic: &HashMap<TopicName, Vec<Event>>,
        log: &dyn Log,
        low: Timestamp,
        high: Timestamp,
        current_job_name: &TopicName,
    ) -> bool {
        let filter_ok = self.filter.as_ref().map(|f| f.is_active(events_by_topic)).unwrap_or(true);
        let predicate_ok = self
            .predicate
            .as_ref()
            .map(|p| p.apply(log, low, high, current_job_name))
            .unwrap_or(true);
        filter_ok && predicate_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Payload;

    fn event_with_state(topic: &TopicName, ts: u64, state: JobState) -> Event {
        Event::new(
            topic.clone(),
            Timestamp(ts),
            Payload::Job(crate::event::JobPayload { state: Some(state), ..Default::default() }),
        )
    }

    #[test]
    fn any_job_state_filter_looks_at_latest_event_per_topic() {
        let job = TopicName::base("j1");
        let filter = AnyJobStateEventFilter { job_names: vec![job.clone()], on_states: vec![JobState::Succeeded] };
        let mut events = HashMap::new();
        events.insert(job.clone(), vec![event_with_state(&job, 1, JobState::Running), event_with_state(&job, 2, JobState::Succeeded)]);
        assert!(filter.is_active(&events));
    }

    #[test]
    fn any_job_state_filter_inactive_when_latest_does_not_match() {
        let job = TopicName::base("j1");
        let filter = AnyJobStateEventFilter { job_names: vec![job.clone()], on_states: vec![JobState::Succeeded] };
        let mut events = HashMap::new();
        events.insert(job.clone(), vec![event_with_state(&job, 1, JobState::Succeeded), event_with_state(&job, 2, JobState::Running)]);
        assert!(!filter.is_active(&events));
    }
}
