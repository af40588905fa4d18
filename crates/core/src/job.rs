// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs: a name, what to run, the triggers that run it, which runners are
//! eligible, and the scope it belongs to.

use crate::error::CoreError;
use crate::runner::{RunnerFunction, RunnerPredicate, VersionedRunnerFunction};
use crate::scope::{ScopeValues, BASE_SCOPE};
use crate::topic::{current_job, TopicName};
use crate::trigger::TriggerAction;
use parking_lot::Mutex;
use std::sync::Arc;

/// Either a runner function fixed at construction time, or one that must
/// be resolved lazily when the job actually runs.
#[derive(Clone)]
pub enum JobFunction {
    Fixed(RunnerFunction),
    Versioned(Arc<dyn VersionedRunnerFunction>),
}

impl std::fmt::Debug for JobFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobFunction::Fixed(rf) => f.debug_tuple("Fixed").field(rf).finish(),
            JobFunction::Versioned(_) => f.debug_tuple("Versioned").field(&"<dyn>").finish(),
        }
    }
}

/// A schedulable unit: a name, what to run, and the triggers that run it.
pub struct Job {
    pub name: TopicName,
    pub job_function: JobFunction,
    pub trigger_actions: Vec<TriggerAction>,
    pub runner_predicate: Option<Arc<dyn RunnerPredicate>>,
    pub scope: ScopeValues,
    /// Computed once the scheduler binds this job's subscriptions; `None`
    /// beforehand.
    subscribed_topics: Mutex<Option<Vec<TopicName>>>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("trigger_actions", &self.trigger_actions.len())
            .finish()
    }
}

impl Job {
    /// Builds a job in the base scope with no runner predicate and no
    /// triggers. Use the setter methods to fill in the rest.
    pub fn new(name: TopicName, job_function: JobFunction) -> Result<Self, CoreError> {
        Self::with_scope(name, job_function, BASE_SCOPE())
    }

    pub fn with_scope(name: TopicName, job_function: JobFunction, scope: ScopeValues) -> Result<Self, CoreError> {
        if name == current_job() {
            return Err(CoreError::InvalidJob("a job may not be named CURRENT_JOB".into()));
        }
        if scope.is_all_scopes() {
            return Err(CoreError::InvalidJob(format!("job {name} may not be constructed with ALL_SCOPES")));
        }
        Ok(Self {
            name,
            job_function,
            trigger_actions: Vec::new(),
            runner_predicate: None,
            scope,
            subscribed_topics: Mutex::new(None),
        })
    }

    pub fn with_trigger_actions(mut self, trigger_actions: Vec<TriggerAction>) -> Self {
        self.trigger_actions = trigger_actions;
        self
    }

    pub fn with_runner_predicate(mut self, predicate: Arc<dyn RunnerPredicate>) -> Self {
        self.runner_predicate = Some(predicate);
        self
    }

    pub fn subscribed_topics(&self) -> Option<Vec<TopicName>> {
        self.subscribed_topics.lock().clone()
    }

    /// Records the topics the scheduler ended up subscribing this job's
    /// triggers to. Called exactly once, by `create_job_subscriptions`.
    pub fn set_subscribed_topics(&self, topics: Vec<TopicName>) {
        *self.subscribed_topics.lock() = Some(topics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::LocalFunction;

    fn fixed() -> JobFunction {
        JobFunction::Fixed(RunnerFunction::Local(LocalFunction::new("demo")))
    }

    #[test]
    fn rejects_current_job_as_name() {
        let err = Job::new(current_job(), fixed()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidJob(_)));
    }

    #[test]
    fn rejects_all_scopes() {
        let err = Job::with_scope(TopicName::base("j1"), fixed(), crate::scope::all_scopes()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidJob(_)));
    }

    #[test]
    fn accepts_base_scope_job() {
        let job = Job::new(TopicName::base("j1"), fixed()).unwrap();
        assert_eq!(job.scope, BASE_SCOPE());
        assert!(job.subscribed_topics().is_none());
    }

    #[test]
    fn subscribed_topics_cache_is_set_once() {
        let job = Job::new(TopicName::base("j1"), fixed()).unwrap();
        job.set_subscribed_topics(vec![TopicName::base("other")]);
        assert_eq!(job.subscribed_topics().unwrap().len(), 1);
    }
}
