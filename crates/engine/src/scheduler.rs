// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler: two-phase job loading, manual runs, and the poll loop,
//! all driven from a single dedicated background thread so the event log
//! and the jobs registry never see concurrent mutation from two different
//! async tasks at once.

use crate::event_log::EventLog;
use indexmap::IndexMap;
use parking_lot::Mutex;
use scheduler_core::{Action, CoreError, Job, JobState, Log, Payload, Run, RunnerSource, Timestamp, TopicName};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A closure that builds a runner given the log's append handle. Runners
/// are constructed lazily, at `Scheduler::new` time, so they can close
/// over the log without the scheduler needing to expose internal state.
pub type RunnerFactory = Box<dyn FnOnce(Arc<EventLog>) -> Arc<dyn scheduler_core::JobRunner> + Send>;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { poll_delay: Duration::from_secs_f64(1.0) }
    }
}

type Handoff = Pin<Box<dyn Future<Output = ()> + Send>>;

pub struct Scheduler {
    jobs: Mutex<IndexMap<TopicName, Arc<Job>>>,
    pending_bind: Mutex<Vec<Arc<Job>>>,
    log: Arc<EventLog>,
    runners: Arc<dyn RunnerSource>,
    config: SchedulerConfig,
    handoff_tx: mpsc::UnboundedSender<Handoff>,
    handoff_rx: Mutex<Option<mpsc::UnboundedReceiver<Handoff>>>,
    shutdown: CancellationToken,
    thread: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        runner_factories: Vec<RunnerFactory>,
        runner_source: impl FnOnce(Vec<Arc<dyn scheduler_core::JobRunner>>) -> Arc<dyn RunnerSource>,
        config: SchedulerConfig,
    ) -> Arc<Self> {
        let log = EventLog::new();
        let runners: Vec<Arc<dyn scheduler_core::JobRunner>> =
            runner_factories.into_iter().map(|f| f(log.clone())).collect();
        let runners = runner_source(runners);
        let (handoff_tx, handoff_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            jobs: Mutex::new(IndexMap::new()),
            pending_bind: Mutex::new(Vec::new()),
            log,
            runners,
            config,
            handoff_tx,
            handoff_rx: Mutex::new(Some(handoff_rx)),
            shutdown: CancellationToken::new(),
            thread: Mutex::new(None),
        })
    }

    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    /// Registers `job`, appending its initial `WAITING` event. Must be
    /// followed by `create_job_subscriptions` once all jobs for this batch
    /// have been added — this two-phase split is what lets jobs reference
    /// each other regardless of add order, including circularly.
    pub fn add_job(&self, job: Job) -> Result<(), CoreError> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.name) {
            return Err(CoreError::DuplicateJobName(job.name));
        }
        let job = Arc::new(job);
        jobs.insert(job.name.clone(), job.clone());
        drop(jobs);

        self.pending_bind.lock().push(job.clone());
        self.log.append(job.name.clone(), Payload::Job(scheduler_core::JobPayload::waiting()));
        Ok(())
    }

    /// Binds subscriptions for every job added since the last call. Safe
    /// to call repeatedly, including after scope expansion adds more jobs.
    pub fn create_job_subscriptions(&self) {
        let pending: Vec<Arc<Job>> = std::mem::take(&mut *self.pending_bind.lock());
        for job in pending {
            for trigger_action in job.trigger_actions.clone() {
                let topics = trigger_action.topics_to_subscribe();
                let job = job.clone();
                let log = self.log.clone();
                let runners = self.runners.clone();
                let subscribe_topics = topics.clone();
                self.log.subscribe(subscribe_topics, move |low, high| {
                    let trigger_action = trigger_action.clone();
                    let job = job.clone();
                    let log = log.clone();
                    let runners = runners.clone();
                    let topics = topics.clone();
                    Box::pin(async move {
                        let mut events_by_topic = std::collections::HashMap::new();
                        for topic in &topics {
                            events_by_topic.insert(topic.clone(), log.events_and_state(topic, low, high));
                        }
                        let active = trigger_action.is_active(&events_by_topic, log.as_ref(), low, high, &job.name);
                        if active {
                            if let Err(e) =
                                trigger_action.action.execute(&job, None, runners.as_ref(), log.as_ref(), high).await
                            {
                                warn!(job = %job.name, error = %e, "subscriber action failed");
                            }
                        }
                    })
                });
            }
            let subscribed: Vec<TopicName> =
                job.trigger_actions.iter().flat_map(|ta| ta.topics_to_subscribe()).collect();
            job.set_subscribed_topics(subscribed);
        }
    }

    /// Requests the run action on `job_name`. Returns once the request has
    /// been handed off to the background loop, not once it has actually
    /// run — by the time this returns, it's possible no `RUN_REQUESTED`
    /// event has been appended yet.
    pub fn manual_run(&self, job_name: &TopicName) -> Result<(), CoreError> {
        let job = self.jobs.lock().get(job_name).cloned().ok_or_else(|| CoreError::UnknownJob(job_name.clone()))?;
        let log = self.log.clone();
        let runners = self.runners.clone();
        let fut: Handoff = Box::pin(async move {
            let ts = log.curr_timestamp();
            if let Err(e) = Run.execute(&job, None, runners.as_ref(), log.as_ref(), ts).await {
                warn!(job = %job.name, error = %e, "manual run failed");
            }
        });
        self.handoff_tx.send(fut).map_err(|_| CoreError::SchedulerNotRunning)
    }

    /// True iff no job is `RUN_REQUESTED`/`RUNNING` and every subscriber
    /// has caught up with the log.
    pub fn all_are_waiting(&self) -> bool {
        if !self.log.all_subscribers_called() {
            return false;
        }
        let curr = self.log.curr_timestamp();
        let jobs = self.jobs.lock();
        !jobs.values().any(|job| {
            self.log
                .last_event(&job.name, curr)
                .and_then(|ev| ev.job_state())
                .map(JobState::is_in_flight)
                .unwrap_or(false)
        })
    }

    /// Returns the full event history for `job_name`, for tests/debugging.
    pub fn events_of(&self, job_name: &TopicName) -> Vec<scheduler_core::Event> {
        self.log.events_and_state(job_name, Timestamp::ZERO, self.log.curr_timestamp())
    }

    fn running_and_requested(&self) -> Vec<(TopicName, Option<scheduler_core::Event>)> {
        let curr = self.log.curr_timestamp();
        self.jobs
            .lock()
            .values()
            .filter_map(|job| {
                let ev = self.log.last_event(&job.name, curr)?;
                ev.job_state().filter(|s| s.is_in_flight())?;
                Some((job.name.clone(), Some(ev)))
            })
            .collect()
    }

    async fn poll_loop(self: Arc<Self>) {
        loop {
            let last_events = self.running_and_requested();
            for runner in self.runners.all_runners() {
                if let Err(e) = runner.poll_jobs(&last_events).await {
                    warn!(error = %e, "poll_jobs failed");
                }
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_delay) => {},
                _ = self.shutdown.cancelled() => break,
            }
        }
    }

    async fn drain_handoff(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Handoff>) {
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                received = rx.recv() => match received {
                    Some(fut) => { tokio::spawn(fut); },
                    None => break,
                }
            }
        }
    }

    /// Starts the background thread that owns the event loop: the
    /// subscriber dispatcher, the poll loop, and the drain of work handed
    /// off from other threads via `manual_run`. Call once.
    // Allow expect here: these are construction-time invariants (call-once,
    // runtime/thread spawn), not data-dependent failures.
    #[allow(clippy::expect_used)]
    pub fn start(self: &Arc<Self>) {
        let rx = self.handoff_rx.lock().take().expect("Scheduler::start called twice");
        let this = self.clone();
        let handle = std::thread::Builder::new()
            .name("scheduler".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                    .expect("failed to build scheduler runtime");
                runtime.block_on(async move {
                    info!("scheduler loop starting");
                    let dispatcher = this.log.clone().run_dispatcher();
                    let poller = this.clone().poll_loop();
                    let handoff = this.clone().drain_handoff(rx);
                    tokio::select! {
                        _ = dispatcher => {},
                        _ = poller => {},
                        _ = handoff => {},
                    }
                    info!("scheduler loop stopped");
                });
            })
            .expect("failed to spawn scheduler thread");
        *self.thread.lock() = Some(handle);
    }

    /// Signals shutdown and joins the background thread.
    pub fn stop(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }

    /// Wires a scope generator: whenever `scope_topic` receives a new
    /// instantiation event, expands `generator` against it and binds the
    /// resulting jobs just as if they had been added up front.
    pub fn register_scope_generator(
        self: &Arc<Self>,
        scope_topic: TopicName,
        generator: Arc<dyn crate::scope_expand::ScopeJobFactory>,
    ) {
        let this = self.clone();
        self.log.subscribe(vec![scope_topic.clone()], move |low, high| {
            let this = this.clone();
            let generator = generator.clone();
            let scope_topic = scope_topic.clone();
            Box::pin(async move {
                let events = this.log.events_and_state(&scope_topic, low, high);
                match crate::scope_expand::expand_scope(generator.as_ref(), &events) {
                    Ok(jobs) => {
                        for job in jobs {
                            if let Err(e) = this.add_job(job) {
                                warn!(error = %e, "scope-generated job rejected");
                            }
                        }
                        this.create_job_subscriptions();
                    }
                    Err(e) => warn!(error = %e, "scope expansion failed"),
                }
            })
        });
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
