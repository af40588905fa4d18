// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only helpers shared across crates: a trivially-accepting fake
//! runner, so engine and downstream tests don't each reinvent it.

use crate::error::ActionError;
use crate::event::Event;
use crate::runner::{JobRunner, RunnerFunction};
use crate::topic::TopicName;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// A runner that accepts everything and records every call it receives,
/// without ever reporting completion on its own; tests drive completion
/// by appending directly to the log.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    pub run_calls: Mutex<Vec<(TopicName, String)>>,
    pub poll_calls: Mutex<usize>,
}

#[async_trait]
impl JobRunner for RecordingRunner {
    async fn run(&self, job_name: &TopicName, request_id: &str, _function: &RunnerFunction) -> Result<(), ActionError> {
        self.run_calls.lock().push((job_name.clone(), request_id.to_string()));
        Ok(())
    }

    async fn poll_jobs(&self, _last_events: &[(TopicName, Option<Event>)]) -> Result<(), ActionError> {
        *self.poll_calls.lock() += 1;
        Ok(())
    }

    fn can_run_function(&self, _function: &RunnerFunction) -> bool {
        true
    }
}
