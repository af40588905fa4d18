// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The read/write contract the event log exposes to everything in `core`:
//! triggers, predicates and the run action all see the log only through
//! this trait, so none of them need to know how dispatch or subscriber
//! bookkeeping actually works (that lives in the engine crate).

use crate::event::{Event, Payload};
use crate::timestamp::Timestamp;
use crate::topic::TopicName;

/// Synchronous, non-blocking access to the event log. Implementations must
/// never await or sleep inside these methods — appends and reads happen
/// inline, with dispatch of subscribers handled separately.
pub trait Log: Send + Sync {
    /// Appends a new event to `topic_name`'s history and returns its
    /// timestamp. The returned timestamp is strictly greater than every
    /// previously assigned timestamp.
    fn append(&self, topic_name: TopicName, payload: Payload) -> Timestamp;

    /// The most recent event on `topic_name` with `timestamp <= at`, if any.
    fn last_event(&self, topic_name: &TopicName, at: Timestamp) -> Option<Event>;

    /// The highest timestamp assigned so far.
    fn curr_timestamp(&self) -> Timestamp;

    /// Every event on `topic_name` with `low <= timestamp <= high`, in
    /// ascending timestamp order.
    fn events_and_state(&self, topic_name: &TopicName, low: Timestamp, high: Timestamp) -> Vec<Event>;
}
