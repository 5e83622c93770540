// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AscentWorkerPool: bounded-parallel startup for one level.

use crate::context::Context;
use crate::job::{CancellableOp, Job};
use parking_lot::{Condvar, Mutex};
use rl_core::{
    ActivationError, ActivationFailure, ActivationMode, Descriptor, DescriptorId, ErrorInfo, Level, Phase, ServiceHandle,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct PoolQueueState {
    queue: VecDeque<Arc<dyn ServiceHandle>>,
    running_ids: HashSet<DescriptorId>,
    completed: usize,
    total: usize,
    failures: Vec<ActivationFailure>,
}

struct PoolShared {
    ctx: Arc<Context>,
    job: Arc<Job>,
    level: Level,
    max_threads: usize,
    state: Mutex<PoolQueueState>,
    done_cv: Condvar,
    cancelled: AtomicBool,
}

impl PoolShared {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn note_complete(state: &mut PoolQueueState, cv: &Condvar) {
        if state.completed == state.total {
            cv.notify_all();
        }
    }
}

/// Cooperative cancellation hook for `Job::cancel()`: arms the hard-cancel
/// timer and marks the pool cancelled so idle workers stop picking new
/// work.
struct PoolCancelHandle(Arc<PoolShared>);

impl CancellableOp for PoolCancelHandle {
    fn request_cancel(&self) {
        let shared = &self.0;
        if shared.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let timeout = shared.ctx.config().cancel_timeout();
        if timeout.is_zero() {
            let ids: Vec<DescriptorId> = shared.state.lock().running_ids.iter().cloned().collect();
            for id in ids {
                shared.ctx.hard_cancel_one(&id);
            }
            return;
        }
        let ctx = shared.ctx.clone();
        let shared2 = shared.clone();
        shared.ctx.timer().schedule_once(
            timeout,
            Box::new(move || {
                let ids: Vec<DescriptorId> = shared2.state.lock().running_ids.iter().cloned().collect();
                for id in ids {
                    ctx.hard_cancel_one(&id);
                }
            }),
        );
    }
}

/// Outcome of running one level's worth of activations.
pub(crate) enum PoolOutcome {
    /// Every service either activated or was dispatched through `onError`;
    /// `failures` is the set whose effective action was
    /// `GoToNextLowerLevelAndStop`. Non-empty means the ascending driver
    /// must abort and roll back.
    Completed { failures: Vec<ActivationFailure> },
    /// The job was cancelled while this level was in flight.
    Cancelled,
}

pub(crate) struct AscentWorkerPool {
    ctx: Arc<Context>,
    job: Arc<Job>,
    level: Level,
    services: Vec<Arc<dyn ServiceHandle>>,
}

impl AscentWorkerPool {
    pub(crate) fn new(ctx: Arc<Context>, job: Arc<Job>, level: Level, services: Vec<Arc<dyn ServiceHandle>>) -> Self {
        Self { ctx, job, level, services }
    }

    pub(crate) fn run(self) -> PoolOutcome {
        let total = self.services.len();
        if total == 0 {
            return PoolOutcome::Completed { failures: Vec::new() };
        }
        let cooperative = self.ctx.config().is_cooperative();
        let max_threads = if cooperative { 1 } else { self.ctx.config().max_threads.max(1) as usize };

        let shared = Arc::new(PoolShared {
            ctx: self.ctx.clone(),
            job: self.job.clone(),
            level: self.level,
            max_threads,
            state: Mutex::new(PoolQueueState {
                queue: self.services.into_iter().collect(),
                running_ids: HashSet::new(),
                completed: 0,
                total,
                failures: Vec::new(),
            }),
            done_cv: Condvar::new(),
            cancelled: AtomicBool::new(false),
        });

        self.job.set_current_op(Some(Arc::new(PoolCancelHandle(shared.clone())) as Arc<dyn CancellableOp>));

        let worker_count = total.min(max_threads);
        let extra_workers = worker_count.saturating_sub(1);
        for _ in 0..extra_workers {
            let shared2 = shared.clone();
            self.ctx.dispatcher().spawn(Box::new(move || worker_loop(shared2)));
        }
        worker_loop(shared.clone());

        {
            let mut state = shared.state.lock();
            while state.completed < state.total {
                shared.done_cv.wait(&mut state);
            }
        }

        self.job.set_current_op(None);

        if shared.is_cancelled() {
            return PoolOutcome::Cancelled;
        }
        let failures = std::mem::take(&mut shared.state.lock().failures);
        PoolOutcome::Completed { failures }
    }
}

fn try_pick(
    state: &mut PoolQueueState,
    max_threads: usize,
    already_tried: &HashSet<DescriptorId>,
) -> Option<(Arc<dyn ServiceHandle>, ActivationMode)> {
    if state.queue.is_empty() {
        return None;
    }
    let will_block = state.queue.len() <= max_threads.saturating_sub(state.running_ids.len());
    if will_block {
        let handle = state.queue.pop_front()?;
        state.running_ids.insert(handle.descriptor().id());
        return Some((handle, ActivationMode::Blocking));
    }
    let pos = state.queue.iter().position(|h| !already_tried.contains(&h.descriptor().id()));
    match pos {
        Some(i) => {
            let handle = state.queue.remove(i)?;
            state.running_ids.insert(handle.descriptor().id());
            Some((handle, ActivationMode::NonBlocking))
        }
        None => {
            let handle = state.queue.pop_front()?;
            state.running_ids.insert(handle.descriptor().id());
            Some((handle, ActivationMode::Blocking))
        }
    }
}

/// Walk `root`'s transitive injection points (pruning cycles, following
/// only run-level-scoped descriptors) looking for one the Context currently
/// has mid-activation. Used to pre-empt a non-blocking activation that
/// would otherwise have to block on a sibling worker's in-progress work.
fn would_block_precheck(ctx: &Context, root: &Arc<dyn Descriptor>) -> bool {
    let mut visited: HashSet<DescriptorId> = HashSet::new();
    visited.insert(root.id());
    let mut stack: Vec<DescriptorId> = root.injection_points();
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        if ctx.is_activating(&id) {
            return true;
        }
        if let Some(d) = ctx.locator().descriptor_of(&id) {
            if d.scope() == rl_core::ScopeTag::run_level() {
                stack.extend(d.injection_points());
            }
        }
    }
    false
}

fn worker_loop(shared: Arc<PoolShared>) {
    let mut already_tried: HashSet<DescriptorId> = HashSet::new();
    loop {
        if shared.is_cancelled() {
            let mut state = shared.state.lock();
            let drained = state.queue.len();
            state.queue.clear();
            state.completed += drained;
            PoolShared::note_complete(&mut state, &shared.done_cv);
            break;
        }

        let picked = {
            let mut state = shared.state.lock();
            try_pick(&mut state, shared.max_threads, &already_tried)
        };
        let Some((service, mode)) = picked else { break };

        service.set_hint(mode);
        let descriptor = service.descriptor();
        let outcome = if mode == ActivationMode::NonBlocking && would_block_precheck(&shared.ctx, &descriptor) {
            Err(ActivationError::WouldBlock)
        } else {
            shared.ctx.begin_activating(descriptor.id(), service.clone());
            let r = service.activate();
            shared.ctx.end_activating(&descriptor.id());
            r
        };
        service.clear_hint();

        match outcome {
            Ok(()) => {
                let mut state = shared.state.lock();
                state.running_ids.remove(&descriptor.id());
                state.completed += 1;
                PoolShared::note_complete(&mut state, &shared.done_cv);
            }
            Err(ActivationError::WouldBlock) => {
                already_tried.insert(descriptor.id());
                let mut state = shared.state.lock();
                state.running_ids.remove(&descriptor.id());
                state.queue.push_back(service);
            }
            Err(ActivationError::WasCancelled) => {
                let mut state = shared.state.lock();
                state.running_ids.remove(&descriptor.id());
                state.completed += 1;
                PoolShared::note_complete(&mut state, &shared.done_cv);
            }
            Err(ActivationError::Other(e)) => {
                let info = ErrorInfo {
                    descriptor: descriptor.id(),
                    level: shared.level,
                    phase: Phase::Ascent,
                    cause: Arc::from(e.to_string()),
                };
                let action = shared.job.dispatch_error(&info);
                shared.ctx.record_error(info.descriptor.clone(), info.cause.clone(), action);
                let mut state = shared.state.lock();
                state.running_ids.remove(&descriptor.id());
                if action == rl_core::ErrorAction::GoToNextLowerLevelAndStop {
                    state.failures.push(ActivationFailure {
                        descriptor: info.descriptor,
                        level: info.level,
                        cause: info.cause,
                    });
                }
                state.completed += 1;
                PoolShared::note_complete(&mut state, &shared.done_cv);
            }
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
