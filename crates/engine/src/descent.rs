// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DescentQueue: strictly serial teardown for one level.

use crate::context::Context;
use crate::job::{CancellableOp, Job};
use parking_lot::{Condvar, Mutex};
use rl_core::{DestructionError, ErrorAction, ErrorInfo, Level, Phase, ServiceHandle};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the hard-cancel-down watchdog polls the queue for shrinkage.
const WATCHDOG_POLL_INTERVAL: Duration = Duration::from_millis(50);

struct DescentQueueInner {
    queue: Mutex<VecDeque<Arc<dyn ServiceHandle>>>,
    hard_cancelled: AtomicBool,
    last_observed_len: AtomicUsize,
}

/// Cooperative cancellation hook: arms the fixed-delay hard-cancel-down
/// watchdog the first time it's invoked for a given descent.
struct DescentCancelHandle {
    inner: Arc<DescentQueueInner>,
    ctx: Arc<Context>,
    armed: AtomicBool,
}

impl CancellableOp for DescentCancelHandle {
    fn request_cancel(&self) {
        if self.armed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.last_observed_len.store(usize::MAX, Ordering::SeqCst);
        let inner = self.inner.clone();
        self.ctx.timer().schedule_fixed_delay(
            WATCHDOG_POLL_INTERVAL,
            Box::new(move || {
                let current_len = inner.queue.lock().len();
                let previous = inner.last_observed_len.swap(current_len, Ordering::SeqCst);
                if current_len > 0 && current_len == previous {
                    inner.hard_cancelled.store(true, Ordering::SeqCst);
                }
            }),
        );
    }
}

pub(crate) struct DescentOutcome {
    /// `true` if any destruction's effective `onError` action was
    /// `GoToNextLowerLevelAndStop`, meaning the descending driver must clamp
    /// its floor to the level just finished.
    pub(crate) clamp: bool,
}

pub(crate) struct DescentQueue {
    ctx: Arc<Context>,
    job: Arc<Job>,
    level: Level,
    inner: Arc<DescentQueueInner>,
}

impl DescentQueue {
    pub(crate) fn new(ctx: Arc<Context>, job: Arc<Job>, level: Level, services: Vec<Arc<dyn ServiceHandle>>) -> Self {
        Self {
            ctx,
            job,
            level,
            inner: Arc::new(DescentQueueInner {
                queue: Mutex::new(services.into_iter().collect()),
                hard_cancelled: AtomicBool::new(false),
                last_observed_len: AtomicUsize::new(usize::MAX),
            }),
        }
    }

    pub(crate) fn run(self) -> DescentOutcome {
        let cancel_handle = Arc::new(DescentCancelHandle {
            inner: self.inner.clone(),
            ctx: self.ctx.clone(),
            armed: AtomicBool::new(false),
        });
        self.job.set_current_op(Some(cancel_handle as Arc<dyn CancellableOp>));

        let mut clamp = false;
        loop {
            let next = self.inner.queue.lock().pop_front();
            let Some(service) = next else { break };
            match self.destroy_one(&service) {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    let info = ErrorInfo {
                        descriptor: service.descriptor().id(),
                        level: self.level,
                        phase: Phase::Descent,
                        cause: Arc::from(e.to_string()),
                    };
                    // Cleanup descents still surface errors to onError
                    // even though progress/cancelled
                    // callbacks are suppressed below.
                    let action = self.job.dispatch_error(&info);
                    self.ctx.record_error(info.descriptor.clone(), info.cause.clone(), action);
                    if action == ErrorAction::GoToNextLowerLevelAndStop {
                        clamp = true;
                    }
                }
                None => {
                    // Hard-cancelled mid-destruction; move on without
                    // surfacing a synthetic error.
                }
            }
        }

        self.job.set_current_op(None);
        DescentOutcome { clamp }
    }

    fn destroy_one(&self, service: &Arc<dyn ServiceHandle>) -> Option<Result<(), DestructionError>> {
        let outcome: Arc<Mutex<Option<Result<(), DestructionError>>>> = Arc::new(Mutex::new(None));
        let cv = Arc::new(Condvar::new());
        {
            let outcome = outcome.clone();
            let cv = cv.clone();
            let service2 = service.clone();
            let body = move || {
                let r = service2.destroy();
                *outcome.lock() = Some(r);
                cv.notify_all();
            };
            if self.ctx.config().is_cooperative() {
                body();
            } else {
                self.ctx.dispatcher().spawn(Box::new(body));
            }
        }
        let mut guard = outcome.lock();
        loop {
            if guard.is_some() {
                return guard.take();
            }
            if self.inner.hard_cancelled.swap(false, Ordering::SeqCst) {
                service.request_hard_cancel();
                // Re-arm: the watchdog only ever observed this one item
                // stuck. Reset the baseline so the next item gets a fresh
                // stall window instead of being hard-cancelled on sight.
                self.inner.last_observed_len.store(usize::MAX, Ordering::SeqCst);
                return None;
            }
            cv.wait_for(&mut guard, WATCHDOG_POLL_INTERVAL);
        }
    }
}
