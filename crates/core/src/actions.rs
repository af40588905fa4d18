// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The run action: single-flight job execution, override application,
//! latest-event argument substitution, and runner selection.

use crate::error::ActionError;
use crate::job::{Job, JobFunction};
use crate::log::Log;
use crate::runner::{Arg, JobRunner, LocalFunction, RemoteDeployedCommand, RemoteDeployedFunction, RunnerFunction, RunnerSource};
use crate::timestamp::Timestamp;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

crate::define_id! {
    /// A run request identifier: opaque, globally unique with overwhelming
    /// probability. Equivalent to a UUIDv4 for this purpose.
    pub struct RunRequestId("run-");
}

/// Overrides a caller may apply to a job's runner function when invoking
/// the run action. Each field only applies to specific `RunnerFunction`
/// variants; applying it to an incompatible variant is an error rather
/// than a silent no-op.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub function_args: Option<Vec<Arg>>,
    pub function_kwargs: Option<HashMap<String, Arg>>,
    pub context_variables: Option<HashMap<String, serde_json::Value>>,
    pub db_userspace: Option<String>,
}

const DB_USERSPACE_ENV_KEY: &str = "DB_DEFAULT_USERSPACE";

/// An action the scheduler can execute against a job when its trigger
/// fires.
#[async_trait]
pub trait Action: Send + Sync + fmt::Debug {
    async fn execute(
        &self,
        job: &Job,
        overrides: Option<&RunOverrides>,
        runners: &dyn RunnerSource,
        log: &dyn Log,
        timestamp: Timestamp,
    ) -> Result<String, ActionError>;
}

/// The only action this kernel ships: request that a job run, deduping
/// against any run already in flight.
#[derive(Debug, Clone, Copy, Default)]
pub struct Run;

#[async_trait]
impl Action for Run {
    async fn execute(
        &self,
        job: &Job,
        overrides: Option<&RunOverrides>,
        runners: &dyn RunnerSource,
        log: &dyn Log,
        timestamp: Timestamp,
    ) -> Result<String, ActionError> {
        // Single-flight: a run already requested or running wins, no new
        // event is appended and no new runner is chosen.
        if let Some(ev) = log.last_event(&job.name, timestamp) {
            if let Some(state) = ev.job_state() {
                if state.is_in_flight() {
                    if let Some(payload) = ev.as_job_payload() {
                        if let Some(request_id) = &payload.request_id {
                            return Ok(request_id.clone());
                        }
                    }
                }
            }
        }

        let request_id = RunRequestId::new();

        let resolved = match &job.job_function {
            JobFunction::Fixed(rf) => rf.clone(),
            JobFunction::Versioned(v) => v.resolve().await?,
        };

        let resolved = match overrides {
            Some(ov) => apply_overrides(resolved, ov)?,
            None => resolved,
        };

        let resolved = substitute_latest_event_args(resolved, log, timestamp);

        let runner = choose_runner(job, &resolved, runners)?;

        log.append(job.name.clone(), crate::event::Payload::Job(crate::event::JobPayload::run_requested(request_id.to_string())));

        runner
            .run(&job.name, request_id.as_str(), &resolved)
            .await
            .map_err(|e| ActionError::RunRequestFailed(e.to_string()))?;

        Ok(request_id.to_string())
    }
}

/// Applies `overrides` to `function`, following the exact compatibility
/// rules: `function_args`/`function_kwargs` only apply to local or remote
/// functions, `context_variables` only to remote commands, and
/// `db_userspace` only to the two remote variants (merged into their
/// environment variables under `DB_DEFAULT_USERSPACE`).
pub fn apply_overrides(function: RunnerFunction, overrides: &RunOverrides) -> Result<RunnerFunction, ActionError> {
    let mut function = function;

    if overrides.function_args.is_some() || overrides.function_kwargs.is_some() {
        function = match function {
            RunnerFunction::Local(mut lf) => {
                if let Some(args) = &overrides.function_args {
                    lf.function_args = args.clone();
                }
                if let Some(kwargs) = &overrides.function_kwargs {
                    lf.function_kwargs = kwargs.clone();
                }
                RunnerFunction::Local(lf)
            }
            RunnerFunction::RemoteFunction(mut rf) => {
                if let Some(args) = &overrides.function_args {
                    rf.function.function_args = args.clone();
                }
                if let Some(kwargs) = &overrides.function_kwargs {
                    rf.function.function_kwargs = kwargs.clone();
                }
                RunnerFunction::RemoteFunction(rf)
            }
            _ => {
                return Err(ActionError::OverrideNotApplicable(
                    "function_args/function_kwargs only apply to local or remote functions".into(),
                ));
            }
        };
    }

    if let Some(context_variables) = &overrides.context_variables {
        function = match function {
            RunnerFunction::RemoteCommand(mut rc) => {
                rc.context_variables = context_variables.clone();
                RunnerFunction::RemoteCommand(rc)
            }
            _ => {
                return Err(ActionError::OverrideNotApplicable(
                    "context_variables only applies to remote commands".into(),
                ));
            }
        };
    }

    if let Some(db_userspace) = &overrides.db_userspace {
        function = match function {
            RunnerFunction::RemoteCommand(mut rc) => {
                rc.environment_variables
                    .insert(DB_USERSPACE_ENV_KEY.to_string(), db_userspace.clone());
                RunnerFunction::RemoteCommand(rc)
            }
            RunnerFunction::RemoteFunction(mut rf) => {
                rf.environment_variables
                    .insert(DB_USERSPACE_ENV_KEY.to_string(), db_userspace.clone());
                RunnerFunction::RemoteFunction(rf)
            }
            _ => {
                return Err(ActionError::OverrideNotApplicable(
                    "db_userspace only applies to remote commands or remote functions".into(),
                ));
            }
        };
    }

    Ok(function)
}

fn substitute_arg(arg: &Arg, log: &dyn Log, at: Timestamp) -> Arg {
    match arg {
        Arg::LatestEvent(topic) => {
            let value = log
                .last_event(topic, at)
                .and_then(|ev| serde_json::to_value(&ev).ok())
                .unwrap_or(serde_json::Value::Null);
            Arg::Value(value)
        }
        value @ Arg::Value(_) => value.clone(),
    }
}

fn substitute_args(args: &[Arg], log: &dyn Log, at: Timestamp) -> Vec<Arg> {
    args.iter().map(|a| substitute_arg(a, log, at)).collect()
}

fn substitute_kwargs(kwargs: &HashMap<String, Arg>, log: &dyn Log, at: Timestamp) -> HashMap<String, Arg> {
    kwargs.iter().map(|(k, v)| (k.clone(), substitute_arg(v, log, at))).collect()
}

/// Replaces any `Arg::LatestEvent` marker in `function`'s arguments with
/// the literal event observed on that topic as of `at`.
pub fn substitute_latest_event_args(function: RunnerFunction, log: &dyn Log, at: Timestamp) -> RunnerFunction {
    match function {
        RunnerFunction::Local(mut lf) => {
            lf.function_args = substitute_args(&lf.function_args, log, at);
            lf.function_kwargs = substitute_kwargs(&lf.function_kwargs, log, at);
            RunnerFunction::Local(lf)
        }
        RunnerFunction::RemoteFunction(mut rf) => {
            rf.function.function_args = substitute_args(&rf.function.function_args, log, at);
            rf.function.function_kwargs = substitute_kwargs(&rf.function.function_kwargs, log, at);
            RunnerFunction::RemoteFunction(rf)
        }
        other @ RunnerFunction::RemoteCommand(_) => other,
    }
}

/// Filters the available runners by the job's predicate (if any) and by
/// `can_run_function`, then chooses uniformly at random among survivors.
pub fn choose_runner(
    job: &Job,
    function: &RunnerFunction,
    runners: &dyn RunnerSource,
) -> Result<Arc<dyn JobRunner>, ActionError> {
    let all = runners.all_runners();
    let predicate_filtered: Vec<Arc<dyn JobRunner>> = match &job.runner_predicate {
        Some(predicate) => all.into_iter().filter(|r| predicate.apply(r.as_ref())).collect(),
        None => all,
    };
    let compatible: Vec<Arc<dyn JobRunner>> =
        predicate_filtered.into_iter().filter(|r| r.can_run_function(function)).collect();

    if compatible.is_empty() {
        return Err(ActionError::NoCompatibleRunner(job.name.clone()));
    }

    let idx = runners.pick_random(compatible.len());
    Ok(compatible[idx].clone())
}

#[cfg(test)]
#[path = "actions_tests.rs"]
mod tests;
