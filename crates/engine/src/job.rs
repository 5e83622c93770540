// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job: one run-level transition in flight.
//!
//! Phase is a tagged variant rather than a pair of nullable driver fields,
//! so a job is unambiguously idle, ascending, descending, or done, never
//! ascending and descending at once.

use crate::context::Context;
use crate::drivers::{DownDriver, DriverOutcome, UpDriver};
use crate::error::{WaitError, WaitOutcome};
use parking_lot::{Condvar, Mutex};
use rl_core::{
    CoreError, ErrorAction, ErrorInfo, IdGen, JobControl, JobFailure, Level, ProgressStartedListener, RunLevelListener, Sorter, UuidIdGen,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobPhase {
    Idle,
    Ascending,
    Descending,
    Done,
}

struct JobState {
    phase: JobPhase,
    proposed: Level,
    cancelled: bool,
    repurpose_requested: bool,
    generation: u64,
    done: bool,
    result: Option<Result<(), JobFailure>>,
}

/// Anything a driver is currently running that a `Job::cancel()` call must
/// be able to reach into from another thread: the AscentWorkerPool while
/// ascending, the DescentQueue while descending.
pub(crate) trait CancellableOp: Send + Sync {
    fn request_cancel(&self);
}

/// One run-level transition. Constructed by `Context::submit`/`Orchestrator::submit`
/// and driven to completion by a single background (or inline, in
/// cooperative mode) thread.
pub struct Job {
    pub(crate) ctx: Arc<Context>,
    run_id: String,
    state: Mutex<JobState>,
    condvar: Condvar,
    pub(crate) listeners: Vec<Arc<dyn RunLevelListener>>,
    pub(crate) sorters: Vec<Arc<dyn Sorter>>,
    in_callback: AtomicBool,
    current_op: Mutex<Option<Arc<dyn CancellableOp>>>,
}

impl Job {
    pub(crate) fn new(
        ctx: Arc<Context>,
        proposed: Level,
        listeners: Vec<Arc<dyn RunLevelListener>>,
        sorters: Vec<Arc<dyn Sorter>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            ctx,
            run_id: UuidIdGen.next(),
            state: Mutex::new(JobState {
                phase: JobPhase::Idle,
                proposed,
                cancelled: false,
                repurpose_requested: false,
                generation: 0,
                done: false,
                result: None,
            }),
            condvar: Condvar::new(),
            listeners,
            sorters,
            in_callback: AtomicBool::new(false),
            current_op: Mutex::new(None),
        })
    }

    /// Unique identifier for this transition, for correlating log lines
    /// across the ascent/descent it drives.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn is_up(&self) -> bool {
        self.state.lock().phase == JobPhase::Ascending
    }

    pub fn is_down(&self) -> bool {
        self.state.lock().phase == JobPhase::Descending
    }

    pub fn is_done(&self) -> bool {
        self.state.lock().done
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancelled
    }

    /// Request cancellation. Idempotent: returns `true` only for the call
    /// that actually transitioned the job into the cancelled state, so
    /// exactly one `onCancelled` dispatch happens no matter how many
    /// threads race to call this.
    pub fn cancel(&self) -> bool {
        {
            let mut state = self.state.lock();
            if state.done || state.cancelled {
                return false;
            }
            state.cancelled = true;
        }
        if let Some(op) = self.current_op.lock().clone() {
            op.request_cancel();
        }
        true
    }

    /// Block until the job settles, is retargeted mid-flight, or `timeout`
    /// elapses.
    pub fn wait(&self, timeout: Duration) -> Result<WaitOutcome, WaitError> {
        let mut state = self.state.lock();
        let start_generation = state.generation;
        let deadline = Instant::now() + timeout;
        loop {
            if state.done {
                return match state.result.clone() {
                    Some(Ok(())) => Ok(WaitOutcome::Done),
                    Some(Err(failure)) => Err(WaitError::Failed(failure)),
                    None => Ok(WaitOutcome::Done),
                };
            }
            if state.generation != start_generation {
                return Ok(WaitOutcome::Repurposed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(WaitError::TimedOut);
            }
            let timed_out = self.condvar.wait_for(&mut state, remaining).timed_out();
            if timed_out && state.generation == start_generation && !state.done {
                return Err(WaitError::TimedOut);
            }
        }
    }

    pub(crate) fn enter_callback(&self) {
        self.in_callback.store(true, Ordering::SeqCst);
    }

    pub(crate) fn exit_callback(&self) {
        self.in_callback.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_current_op(&self, op: Option<Arc<dyn CancellableOp>>) {
        *self.current_op.lock() = op;
    }

    pub(crate) fn take_repurpose_if_flagged(&self) -> bool {
        let mut state = self.state.lock();
        if state.repurpose_requested {
            state.repurpose_requested = false;
            state.generation += 1;
            self.condvar.notify_all();
            true
        } else {
            false
        }
    }

    pub(crate) fn set_phase(&self, phase: JobPhaseMarker) {
        self.state.lock().phase = match phase {
            JobPhaseMarker::Ascending => JobPhase::Ascending,
            JobPhaseMarker::Descending => JobPhase::Descending,
        };
    }

    fn finish(&self, result: Result<(), JobFailure>) {
        let mut state = self.state.lock();
        state.phase = JobPhase::Done;
        state.done = true;
        state.result = Some(result);
        self.condvar.notify_all();
        drop(state);
        self.ctx.job_done();
    }

    pub(crate) fn dispatch_progress_started(&self, listeners: &[Arc<dyn ProgressStartedListener>], current_level: Level) {
        self.enter_callback();
        for l in listeners {
            l.on_progress_started(self, current_level);
        }
        self.exit_callback();
    }

    pub(crate) fn dispatch_progress(&self, level: Level) {
        self.enter_callback();
        for l in &self.listeners {
            l.on_progress(self, level);
        }
        self.exit_callback();
    }

    pub(crate) fn dispatch_cancelled(&self, level: Level) {
        self.enter_callback();
        for l in &self.listeners {
            l.on_cancelled(self, level);
        }
        self.exit_callback();
    }

    pub(crate) fn dispatch_error(&self, info: &ErrorInfo) -> ErrorAction {
        self.enter_callback();
        let action = ErrorAction::fold_all(self.listeners.iter().map(|l| l.on_error(self, info)));
        self.exit_callback();
        action
    }

    pub(crate) fn apply_sorters(&self, level: Level, services: Vec<Arc<dyn rl_core::ServiceHandle>>) -> Vec<Arc<dyn rl_core::ServiceHandle>> {
        let mut current = services;
        for sorter in &self.sorters {
            if let Some(reordered) = sorter.sort(level, &current) {
                current = reordered;
            }
        }
        current
    }

    /// Start driving this job to completion. Runs inline if the config is
    /// cooperative, otherwise hands the whole transition loop to the
    /// dispatcher as a single task (the drivers themselves fan further work
    /// out across the dispatcher, per level).
    pub(crate) fn start(self: &Arc<Self>) {
        let job = self.clone();
        let body = move || job.run_to_completion();
        if self.ctx.config().is_cooperative() {
            body();
        } else {
            self.ctx.dispatcher().spawn(Box::new(body));
        }
    }

    fn run_to_completion(self: &Arc<Self>) {
        let span = tracing::info_span!("run_level_job", job_id = %self.run_id, proposed = %self.proposed_level());
        let _guard = span.enter();
        loop {
            let current = self.ctx.current();
            let proposed = self.proposed_level();
            if current == proposed {
                tracing::info!(level = %current, "already at proposed level");
                self.finish(Ok(()));
                return;
            }
            let outcome = if proposed > current {
                self.set_phase(JobPhaseMarker::Ascending);
                UpDriver::new(self.clone()).run()
            } else {
                self.set_phase(JobPhaseMarker::Descending);
                DownDriver::new(self.clone(), false).run()
            };
            match outcome {
                DriverOutcome::Repurposed => {
                    tracing::info!(proposed = %self.proposed_level(), "repurposed mid-transition");
                    continue;
                }
                DriverOutcome::Done => {
                    tracing::info!(level = %self.ctx.current(), "reached proposed level");
                    self.finish(Ok(()));
                    return;
                }
                DriverOutcome::Failed(failure) => {
                    tracing::warn!(level = %failure.level, failures = failure.errors().len(), "rolled back after failure");
                    self.finish(Err(failure));
                    return;
                }
                DriverOutcome::Cancelled => {
                    tracing::info!(level = %self.ctx.current(), "cancelled");
                    self.finish(Ok(()));
                    return;
                }
            }
        }
    }
}

pub(crate) enum JobPhaseMarker {
    Ascending,
    Descending,
}

impl JobControl for Job {
    fn proposed_level(&self) -> Level {
        self.state.lock().proposed
    }

    fn current_level(&self) -> Level {
        self.ctx.current()
    }

    fn change_proposed_level(&self, new_level: Level) -> Result<Level, CoreError> {
        if !self.in_callback.load(Ordering::SeqCst) {
            return Err(CoreError::IllegalState);
        }
        let mut state = self.state.lock();
        if state.done {
            return Err(CoreError::IllegalState);
        }
        let old = state.proposed;
        let current = self.ctx.current();
        let was_up = old > current;
        let now_up = new_level > current;
        state.proposed = new_level;
        if new_level != current && was_up != now_up && !matches!(state.phase, JobPhase::Idle) {
            state.repurpose_requested = true;
        }
        Ok(old)
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
