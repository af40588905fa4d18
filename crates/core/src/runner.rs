// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner functions: self-contained, serializable descriptions of what to
//! execute, and the traits a host application implements to supply and
//! select among actual runner processes.

use crate::error::ActionError;
use crate::event::Event;
use crate::topic::TopicName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A function argument: either a literal value, or a marker asking the run
/// action to substitute the latest event observed on `topic` at run time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Arg {
    #[serde(rename = "value")]
    Value(serde_json::Value),
    #[serde(rename = "latest_event")]
    LatestEvent(TopicName),
}

/// A function that runs in the same process/interpreter as the runner,
/// identified by an opaque, serializable handle rather than a pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFunction {
    pub function_id: String,
    pub function_args: Vec<Arg>,
    pub function_kwargs: HashMap<String, Arg>,
}

impl LocalFunction {
    pub fn new(function_id: impl Into<String>) -> Self {
        Self { function_id: function_id.into(), function_args: Vec::new(), function_kwargs: HashMap::new() }
    }
}

/// A shell command deployed and executed out of process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDeployedCommand {
    pub command: Vec<String>,
    pub context_variables: HashMap<String, serde_json::Value>,
    pub environment_variables: HashMap<String, String>,
}

/// A function deployed and executed out of process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDeployedFunction {
    pub function: LocalFunction,
    pub environment_variables: HashMap<String, String>,
}

/// The resolved description of what a runner should execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RunnerFunction {
    #[serde(rename = "local_function")]
    Local(LocalFunction),
    #[serde(rename = "remote_command")]
    RemoteCommand(RemoteDeployedCommand),
    #[serde(rename = "remote_function")]
    RemoteFunction(RemoteDeployedFunction),
}

/// A job function that must be resolved lazily, at run time, rather than
/// fixed when the job is constructed (e.g. "the latest deployed version of
/// this function").
#[async_trait]
pub trait VersionedRunnerFunction: Send + Sync + fmt::Debug {
    async fn resolve(&self) -> Result<RunnerFunction, ActionError>;
}

/// A runner process or service the scheduler can hand work to.
#[async_trait]
pub trait JobRunner: Send + Sync + fmt::Debug {
    /// Requests that `function` run under `request_id`. Returning `Ok`
    /// means the request was accepted, not that the run completed; the
    /// runner reports completion asynchronously through the log via the
    /// append handle it was constructed with.
    async fn run(
        &self,
        job_name: &TopicName,
        request_id: &str,
        function: &RunnerFunction,
    ) -> Result<(), ActionError>;

    /// Reconciles state for every job currently `RUN_REQUESTED` or
    /// `RUNNING`. Must be idempotent: polling after a terminal event has
    /// already been appended for a request is a no-op.
    async fn poll_jobs(&self, last_events: &[(TopicName, Option<Event>)]) -> Result<(), ActionError>;

    /// Whether this runner is capable of executing `function` at all,
    /// independent of any job-level runner predicate.
    fn can_run_function(&self, function: &RunnerFunction) -> bool;
}

/// A predicate a job can attach to narrow which runners it may use,
/// independent of `can_run_function`.
pub trait RunnerPredicate: Send + Sync + fmt::Debug {
    fn apply(&self, runner: &dyn JobRunner) -> bool;
}

/// The scheduler's view onto the pool of available runners: enumeration
/// plus a seedable uniform choice among survivors, so runner selection is
/// reproducible in tests.
pub trait RunnerSource: Send + Sync {
    fn all_runners(&self) -> Vec<Arc<dyn JobRunner>>;

    /// Returns an index in `[0, n)`, chosen uniformly at random.
    fn pick_random(&self, n: usize) -> usize;
}
