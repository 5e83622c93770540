// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator: the public facade a DI container embeds.

use crate::context::Context;
use parking_lot::Mutex;
use rl_core::{CoreError, Dispatcher, Level, Locator, OrchestratorConfig, ProgressStartedListener, RunLevelListener, Sorter, Timer};
use std::sync::Arc;

use crate::job::Job;

/// Owns the Context and the listener/sorter registries, and is the single
/// entry point a host calls `submit` on. One `Orchestrator` per embedding
/// container; `Arc` it if the container itself is shared across threads.
pub struct Orchestrator {
    ctx: Arc<Context>,
    progress_started: Mutex<Vec<Arc<dyn ProgressStartedListener>>>,
    listeners: Mutex<Vec<Arc<dyn RunLevelListener>>>,
    sorters: Mutex<Vec<Arc<dyn Sorter>>>,
}

impl Orchestrator {
    pub fn new(locator: Arc<dyn Locator>, dispatcher: Arc<dyn Dispatcher>, timer: Arc<dyn Timer>, config: OrchestratorConfig) -> Self {
        Self {
            ctx: Context::new(locator, dispatcher, timer, config),
            progress_started: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            sorters: Mutex::new(Vec::new()),
        }
    }

    pub fn register_progress_started_listener(&self, listener: Arc<dyn ProgressStartedListener>) {
        self.progress_started.lock().push(listener);
    }

    pub fn register_listener(&self, listener: Arc<dyn RunLevelListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn register_sorter(&self, sorter: Arc<dyn Sorter>) {
        self.sorters.lock().push(sorter);
    }

    pub fn current(&self) -> Level {
        self.ctx.current()
    }

    /// Submit a new proposed level. Fails with `CoreError::Busy` if a job
    /// is already in flight; otherwise snapshots the listener/sorter
    /// registries into the new job, dispatches `onProgressStarted`, and
    /// starts the driver.
    pub fn submit(&self, proposed: Level) -> Result<Arc<Job>, CoreError> {
        let current = self.ctx.current();
        let listeners = self.listeners.lock().clone();
        let sorters = self.sorters.lock().clone();
        let progress_started = self.progress_started.lock().clone();

        let job = Job::new(self.ctx.clone(), proposed, listeners, sorters);
        self.ctx.try_begin_job(job.clone())?;
        self.ctx.clear_errors();
        job.dispatch_progress_started(&progress_started, current);
        job.start();
        Ok(job)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
