// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope expansion: turning a single scope-instantiation event into a
//! fresh batch of jobs, each named by extending its base name with the
//! scope's keys.

use scheduler_core::{Event, Job, ScopeError, ScopeValues};

/// Builds the jobs that belong to one instantiation of a scope. Returned
/// jobs should be given their "base" names; [`expand_scope`] handles
/// extending those names with the scope's keys and assigning `job.scope`.
pub trait ScopeJobFactory: Send + Sync {
    fn build(&self, scope: &ScopeValues) -> Result<Vec<Job>, ScopeError>;
}

/// Expands `generator` against the events delivered to a scope topic's
/// subscription window. Exactly one `ScopeValues` event must be present —
/// a scope topic is instantiated once, not accumulated across a window —
/// and none of the generator's jobs may already carry a key the scope
/// wants to add.
pub fn expand_scope(generator: &dyn ScopeJobFactory, scope_events: &[Event]) -> Result<Vec<Job>, ScopeError> {
    if scope_events.len() != 1 {
        return Err(ScopeError::ScopeArityMismatch(scope_events.len()));
    }
    let scope = scope_events[0].as_scope_values().cloned().ok_or(ScopeError::ScopeArityMismatch(0))?;

    let jobs = generator.build(&scope)?;
    let mut expanded = Vec::with_capacity(jobs.len());
    for mut job in jobs {
        for (key, _) in scope.iter() {
            if job.name.contains_key(key) {
                return Err(ScopeError::ScopeKeyCollision { job: job.name.to_string(), key: key.clone() });
            }
        }
        let pairs: Vec<(String, scheduler_core::Scalar)> = scope.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        job.name = job.name.extended(pairs);
        job.scope = scope.clone();
        expanded.push(job);
    }
    Ok(expanded)
}

#[cfg(test)]
#[path = "scope_expand_tests.rs"]
mod tests;
