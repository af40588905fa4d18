// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event log's unit of record: an immutable `(topic_name, timestamp,
//! payload)` triple, plus the job-state payload the scheduler cares about.

use crate::scope::ScopeValues;
use crate::timestamp::Timestamp;
use crate::topic::TopicName;
use serde::{Deserialize, Serialize};

/// Where a job is in its lifecycle. Re-entrant: a terminal state can be
/// followed by a fresh `WAITING` when the job is re-armed for another run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    #[serde(rename = "WAITING")]
    Waiting,
    #[serde(rename = "RUN_REQUESTED")]
    RunRequested,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "SUCCEEDED")]
    Succeeded,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "FAILED")]
    Failed,
}

crate::simple_display! {
    JobState {
        Waiting => "WAITING",
        RunRequested => "RUN_REQUESTED",
        Running => "RUNNING",
        Succeeded => "SUCCEEDED",
        Cancelled => "CANCELLED",
        Failed => "FAILED",
    }
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Cancelled | JobState::Failed)
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, JobState::RunRequested | JobState::Running)
    }

    /// Whether `self -> next` is a legal transition. `None` for `self`
    /// means "no prior event for this job" (only `WAITING` is legal then).
    pub fn can_transition_to(from: Option<JobState>, next: JobState) -> bool {
        use JobState::*;
        match (from, next) {
            (None, Waiting) => true,
            (None, _) => false,
            (Some(Waiting), RunRequested) => true,
            (Some(RunRequested), Running) => true,
            (Some(RunRequested), Succeeded | Cancelled | Failed) => true,
            (Some(Running), Succeeded | Cancelled | Failed) => true,
            // Re-arm: any terminal state may be followed by a fresh WAITING.
            (Some(s), Waiting) if s.is_terminal() => true,
            _ => false,
        }
    }
}

/// Why a job run ended in `FAILED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    #[serde(rename = "PYTHON_EXCEPTION")]
    PythonException,
    #[serde(rename = "NON_ZERO_RETURN_CODE")]
    NonZeroReturnCode,
    #[serde(rename = "RUN_REQUEST_FAILED")]
    RunRequestFailed,
}

/// The payload carried by every event appended against a job's topic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobPayload {
    pub request_id: Option<String>,
    pub state: Option<JobState>,
    pub failure_kind: Option<FailureKind>,
    pub pid: Option<u32>,
    pub return_code: Option<i32>,
    pub result_value: Option<serde_json::Value>,
    pub raised_exception: Option<String>,
    pub effects: Option<serde_json::Value>,
}

impl JobPayload {
    pub fn waiting() -> Self {
        Self { state: Some(JobState::Waiting), ..Default::default() }
    }

    pub fn run_requested(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            state: Some(JobState::RunRequested),
            ..Default::default()
        }
    }
}

/// The payload an event body can carry. `Custom` absorbs anything a host
/// application logs against a topic the scheduler doesn't interpret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Payload {
    #[serde(rename = "job_state")]
    Job(JobPayload),
    #[serde(rename = "scope_values")]
    Scope(ScopeValues),
    #[serde(other, skip_serializing)]
    Custom,
}

/// One immutable record in the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub topic_name: TopicName,
    pub timestamp: Timestamp,
    pub payload: Payload,
}

impl Event {
    pub fn new(topic_name: TopicName, timestamp: Timestamp, payload: Payload) -> Self {
        Self { topic_name, timestamp, payload }
    }

    pub fn as_job_payload(&self) -> Option<&JobPayload> {
        match &self.payload {
            Payload::Job(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_scope_values(&self) -> Option<&ScopeValues> {
        match &self.payload {
            Payload::Scope(s) => Some(s),
            _ => None,
        }
    }

    pub fn job_state(&self) -> Option<JobState> {
        self.as_job_payload().and_then(|p| p.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_is_reachable_from_nothing() {
        assert!(JobState::can_transition_to(None, JobState::Waiting));
        assert!(!JobState::can_transition_to(None, JobState::Running));
    }

    #[test]
    fn happy_path_transitions() {
        use JobState::*;
        assert!(JobState::can_transition_to(Some(Waiting), RunRequested));
        assert!(JobState::can_transition_to(Some(RunRequested), Running));
        assert!(JobState::can_transition_to(Some(Running), Succeeded));
    }

    #[test]
    fn terminal_states_rearm_to_waiting() {
        use JobState::*;
        assert!(JobState::can_transition_to(Some(Succeeded), Waiting));
        assert!(JobState::can_transition_to(Some(Failed), Waiting));
        assert!(JobState::can_transition_to(Some(Cancelled), Waiting));
    }

    #[test]
    fn terminal_states_do_not_self_loop() {
        use JobState::*;
        assert!(!JobState::can_transition_to(Some(Succeeded), Succeeded));
        assert!(!JobState::can_transition_to(Some(Waiting), Succeeded));
    }

    #[test]
    fn run_requested_can_fail_directly() {
        assert!(JobState::can_transition_to(Some(JobState::RunRequested), JobState::Failed));
    }
}
