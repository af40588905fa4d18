// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy. Variants map one-to-one to the error table in the
//! design notes: each is either surfaced synchronously to a host-API
//! caller or logged diagnostically by the scheduler and never propagated.

use crate::topic::TopicName;
use thiserror::Error;

/// Errors surfaced synchronously from `add_job` / job construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("a job named {0} already exists")]
    DuplicateJobName(TopicName),

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error("unknown job: {0}")]
    UnknownJob(TopicName),

    #[error("scheduler is not running")]
    SchedulerNotRunning,
}

/// Errors produced while executing the run action.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("job function could not be resolved: {0}")]
    BadJobFunction(String),

    #[error("override not applicable: {0}")]
    OverrideNotApplicable(String),

    #[error("no compatible runner for job {0}")]
    NoCompatibleRunner(TopicName),

    #[error("runner failed to accept the run request: {0}")]
    RunRequestFailed(String),
}

/// Errors produced while expanding a scope-generator job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("scope generator requires exactly one scope-values event in its trigger window, got {0}")]
    ScopeArityMismatch(usize),

    #[error("job {job} already has a '{key}' key and cannot take on the scope's '{key}' key")]
    ScopeKeyCollision { job: String, key: String },
}
