// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event log: an append-only, per-topic-indexed store with
//! exactly-once-per-window subscriber dispatch.
//!
//! Appends are synchronous and lock-protected, callable from any thread.
//! Dispatch runs as a single task on the scheduler's background runtime,
//! scanning subscribers one at a time so they execute serially and so an
//! append made from inside a handler is never re-delivered to that same
//! handler mid-call — it lands in a subsequent window once the handler
//! returns.

use parking_lot::Mutex;
use scheduler_core::{Event, Log, Payload, Timestamp, TopicName};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::debug;

/// A boxed, owned future, the shape every subscriber handler is stored as.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type SubscriberFn = Arc<dyn Fn(Timestamp, Timestamp) -> BoxFuture + Send + Sync>;

struct Subscriber {
    topics: Vec<TopicName>,
    handler: SubscriberFn,
    /// `None` until the subscriber's first dispatched window; that first
    /// window's `low` is `Timestamp(0)`, not `last_high.next()`.
    last_high: Option<Timestamp>,
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    by_topic: HashMap<TopicName, Vec<usize>>,
    subscribers: Vec<Subscriber>,
    curr_timestamp: Timestamp,
}

/// The append-only event log, shared by reference between the scheduler,
/// every job's trigger subscriptions, and every runner's append handle.
pub struct EventLog {
    state: Mutex<State>,
    wake: Notify,
}

impl Default for EventLog {
    fn default() -> Self {
        Self { state: Mutex::new(State::default()), wake: Notify::new() }
    }
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `handler` against `topics`, coalescing with an existing
    /// registration of the same handler (if any) rather than creating a
    /// second subscriber that would double-fire.
    pub fn subscribe<F>(&self, topics: Vec<TopicName>, handler: F)
    where
        F: Fn(Timestamp, Timestamp) -> BoxFuture + Send + Sync + 'static,
    {
        let handler: SubscriberFn = Arc::new(handler);
        let mut state = self.state.lock();
        state.subscribers.push(Subscriber { topics, handler, last_high: None });
        drop(state);
        self.wake.notify_one();
    }

    /// True once every subscriber has been invoked up to the log's current
    /// timestamp (or has no relevant events pending) — the scheduler's
    /// quiescence check.
    pub fn all_subscribers_called(&self) -> bool {
        let state = self.state.lock();
        let curr = state.curr_timestamp;
        state.subscribers.iter().all(|s| !subscriber_due(&state, &s.topics, s.last_high, curr))
    }

    /// Runs forever, waking whenever an append or a new subscription might
    /// have made a subscriber due, and invoking due subscribers serially.
    /// Intended to be spawned exactly once, on the scheduler's dedicated
    /// background runtime.
    pub async fn run_dispatcher(self: Arc<Self>) {
        loop {
            let mut dispatched_any = false;
            let subscriber_count = self.state.lock().subscribers.len();
            for idx in 0..subscriber_count {
                let due = {
                    let mut state = self.state.lock();
                    if idx >= state.subscribers.len() {
                        continue;
                    }
                    let curr = state.curr_timestamp;
                    let last_high = state.subscribers[idx].last_high;
                    if !subscriber_due(&state, &state.subscribers[idx].topics, last_high, curr) {
                        None
                    } else {
                        state.subscribers[idx].last_high = Some(curr);
                        let low = last_high.map(Timestamp::next).unwrap_or(Timestamp::ZERO);
                        Some((state.subscribers[idx].handler.clone(), low, curr))
                    }
                };
                if let Some((handler, low, high)) = due {
                    dispatched_any = true;
                    debug!(?low, ?high, "dispatching subscriber window");
                    handler(low, high).await;
                }
            }
            if !dispatched_any {
                self.wake.notified().await;
            }
        }
    }
}

/// Whether `topics` have any event in `(low_exclusive, high]` — `None` for
/// `low_exclusive` means "never dispatched", i.e. every event up to `high`
/// counts (there is no event at or before `Timestamp(0)`).
fn subscriber_due(state: &State, topics: &[TopicName], low_exclusive: Option<Timestamp>, high: Timestamp) -> bool {
    if let Some(low) = low_exclusive {
        if low >= high {
            return false;
        }
    }
    topics.iter().any(|topic| {
        state
            .by_topic
            .get(topic)
            .map(|indices| {
                indices.iter().any(|&i| {
                    let ts = state.events[i].timestamp;
                    let after_low = low_exclusive.map(|low| ts > low).unwrap_or(true);
                    after_low && ts <= high
                })
            })
            .unwrap_or(false)
    })
}

impl Log for EventLog {
    fn append(&self, topic_name: TopicName, payload: Payload) -> Timestamp {
        let mut state = self.state.lock();
        let ts = state.curr_timestamp.next();
        state.curr_timestamp = ts;
        let event = Event::new(topic_name.clone(), ts, payload);
        let idx = state.events.len();
        state.events.push(event);
        state.by_topic.entry(topic_name).or_default().push(idx);
        drop(state);
        self.wake.notify_one();
        ts
    }

    fn last_event(&self, topic_name: &TopicName, at: Timestamp) -> Option<Event> {
        let state = self.state.lock();
        let indices = state.by_topic.get(topic_name)?;
        indices
            .iter()
            .rev()
            .find(|&&i| state.events[i].timestamp <= at)
            .map(|&i| state.events[i].clone())
    }

    fn curr_timestamp(&self) -> Timestamp {
        self.state.lock().curr_timestamp
    }

    fn events_and_state(&self, topic_name: &TopicName, low: Timestamp, high: Timestamp) -> Vec<Event> {
        let state = self.state.lock();
        match state.by_topic.get(topic_name) {
            Some(indices) => indices
                .iter()
                .map(|&i| &state.events[i])
                .filter(|e| e.timestamp >= low && e.timestamp <= high)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
#[path = "event_log_tests.rs"]
mod tests;
