// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The default `Timer`: one-shot and fixed-delay
//! scheduling backed by a dedicated sleeping thread per task, rather than a
//! shared reaper, since the engine only ever schedules a handful of
//! hard-cancel watchdogs concurrently.

use rl_core::{Timer, TimerHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct AtomicCancelHandle(Arc<AtomicBool>);

impl TimerHandle for AtomicCancelHandle {
    fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// Real-time `Timer`. Each scheduled task gets its own sleeping thread;
/// cancellation is cooperative (checked right before the task would run).
#[derive(Debug, Default, Clone, Copy)]
pub struct DeadlineTimer;

impl Timer for DeadlineTimer {
    fn schedule_once(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled2 = cancelled.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            if !cancelled2.swap(true, Ordering::SeqCst) {
                task();
            }
        });
        Box::new(AtomicCancelHandle(cancelled))
    }

    fn schedule_fixed_delay(
        &self,
        period: Duration,
        task: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled2 = cancelled.clone();
        thread::spawn(move || loop {
            thread::sleep(period);
            if cancelled2.load(Ordering::SeqCst) {
                break;
            }
            task();
        });
        Box::new(AtomicCancelHandle(cancelled))
    }
}
