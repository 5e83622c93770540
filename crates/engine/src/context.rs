// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context: the single-job gate and shared mutable state.
//!
//! Lock order is Context lock, then Job lock, then pool/queue locks. The
//! Context lock is never held across a listener callback or a service
//! activation/destruction call.

use crate::job::Job;
use parking_lot::Mutex;
use rl_core::{CoreError, DescriptorId, Dispatcher, ErrorAction, Level, Locator, OrchestratorConfig, ServiceHandle, Timer};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct ContextState {
    current_level: Level,
    active_job: Option<Arc<Job>>,
    activating: HashSet<DescriptorId>,
    inflight: HashMap<DescriptorId, Arc<dyn ServiceHandle>>,
    registry: HashMap<DescriptorId, (Option<std::sync::Arc<str>>, ErrorAction)>,
}

/// Shared state the drivers, the worker pool, and the descent queue all
/// reach into. Owned by the `Orchestrator` facade and handed to every `Job`
/// as an `Arc`.
pub struct Context {
    locator: Arc<dyn Locator>,
    dispatcher: Arc<dyn Dispatcher>,
    timer: Arc<dyn Timer>,
    config: OrchestratorConfig,
    state: Mutex<ContextState>,
}

impl Context {
    pub fn new(
        locator: Arc<dyn Locator>,
        dispatcher: Arc<dyn Dispatcher>,
        timer: Arc<dyn Timer>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            locator,
            dispatcher,
            timer,
            config,
            state: Mutex::new(ContextState {
                current_level: Level::new(0),
                active_job: None,
                activating: HashSet::new(),
                inflight: HashMap::new(),
                registry: HashMap::new(),
            }),
        })
    }

    pub fn current(&self) -> Level {
        self.state.lock().current_level
    }

    pub fn config(&self) -> OrchestratorConfig {
        self.config
    }

    pub fn locator(&self) -> &Arc<dyn Locator> {
        &self.locator
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub fn timer(&self) -> &Arc<dyn Timer> {
        &self.timer
    }

    /// Gate a new submission: fails with `CoreError::Busy` if a job is
    /// already in flight. On success installs `job` as the active job.
    pub(crate) fn try_begin_job(&self, job: Arc<Job>) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        if state.active_job.is_some() {
            return Err(CoreError::Busy);
        }
        state.active_job = Some(job);
        Ok(())
    }

    pub(crate) fn job_done(&self) {
        self.state.lock().active_job = None;
    }

    pub(crate) fn mark_level_achieved(&self, level: Level) {
        self.state.lock().current_level = level;
    }

    pub fn snapshot_ascent(&self, level: Level) -> Vec<Arc<dyn ServiceHandle>> {
        self.locator.snapshot_ascent(level)
    }

    pub fn snapshot_descent(&self, level: Level) -> Vec<Arc<dyn ServiceHandle>> {
        self.locator.snapshot_descent(level)
    }

    pub(crate) fn begin_activating(&self, id: DescriptorId, handle: Arc<dyn ServiceHandle>) {
        let mut state = self.state.lock();
        state.activating.insert(id.clone());
        state.inflight.insert(id, handle);
    }

    pub(crate) fn end_activating(&self, id: &DescriptorId) {
        let mut state = self.state.lock();
        state.activating.remove(id);
        state.inflight.remove(id);
    }

    pub(crate) fn is_activating(&self, id: &DescriptorId) -> bool {
        self.state.lock().activating.contains(id)
    }

    /// Cooperatively ask the handle currently bound to `id` to abort, if
    /// one is in flight. A no-op if nothing is in flight for `id` right now.
    pub(crate) fn hard_cancel_one(&self, id: &DescriptorId) {
        let handle = self.state.lock().inflight.get(id).cloned();
        if let Some(handle) = handle {
            handle.request_hard_cancel();
        }
    }

    pub(crate) fn record_error(&self, id: DescriptorId, cause: std::sync::Arc<str>, action: ErrorAction) {
        self.state.lock().registry.insert(id, (Some(cause), action));
    }

    pub fn last_error(&self, id: &DescriptorId) -> Option<std::sync::Arc<str>> {
        self.state.lock().registry.get(id).and_then(|(cause, _)| cause.clone())
    }

    pub(crate) fn clear_errors(&self) {
        self.state.lock().registry.clear();
    }
}
