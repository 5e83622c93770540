// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-side test doubles, gated behind `#[cfg(any(test, feature = "test-support"))]`.
//!
//! `ManualTimer` pairs with `rl_core::FakeClock`: nothing fires on a real
//! sleep, only when a test explicitly advances the clock and calls `tick`,
//! matching the corpus's stated preference for deterministic time over
//! real sleeps in tests.

use parking_lot::Mutex;
use rl_core::{Clock, FakeClock, Timer, TimerHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

enum ScheduledTask {
    Once {
        due: Instant,
        cancelled: Arc<AtomicBool>,
        task: Option<Box<dyn FnOnce() + Send>>,
    },
    FixedDelay {
        due: Instant,
        period: Duration,
        cancelled: Arc<AtomicBool>,
        task: Box<dyn Fn() + Send + Sync>,
    },
}

struct ManualHandle(Arc<AtomicBool>);

impl TimerHandle for ManualHandle {
    fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }
}

/// A `Timer` driven entirely by `tick()`, against a `FakeClock`. Intended
/// for single-thread cooperative-mode tests; nothing runs on a background
/// thread, and nothing fires until a test explicitly advances the clock and
/// calls `tick()`.
pub struct ManualTimer {
    clock: FakeClock,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl ManualTimer {
    pub fn new(clock: FakeClock) -> Self {
        Self { clock, tasks: Mutex::new(Vec::new()) }
    }

    /// Fire every task whose deadline is at or before the clock's current
    /// instant. Fixed-delay tasks reschedule themselves; one-shot tasks
    /// are removed once fired.
    pub fn tick(&self) {
        let now = self.clock.now();
        let mut tasks = self.tasks.lock();
        let mut i = 0;
        while i < tasks.len() {
            let due = match &tasks[i] {
                ScheduledTask::Once { due, cancelled, .. } => (!cancelled.load(Ordering::SeqCst)).then_some(*due),
                ScheduledTask::FixedDelay { due, cancelled, .. } => (!cancelled.load(Ordering::SeqCst)).then_some(*due),
            };
            let Some(due) = due else {
                tasks.remove(i);
                continue;
            };
            if due > now {
                i += 1;
                continue;
            }
            match &mut tasks[i] {
                ScheduledTask::Once { task, .. } => {
                    if let Some(t) = task.take() {
                        t();
                    }
                    tasks.remove(i);
                }
                ScheduledTask::FixedDelay { due, period, task, .. } => {
                    task();
                    *due += *period;
                    i += 1;
                }
            }
        }
    }
}

impl Timer for ManualTimer {
    fn schedule_once(&self, delay: Duration, task: Box<dyn FnOnce() + Send + 'static>) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let due = self.clock.now() + delay;
        self.tasks.lock().push(ScheduledTask::Once { due, cancelled: cancelled.clone(), task: Some(task) });
        Box::new(ManualHandle(cancelled))
    }

    fn schedule_fixed_delay(&self, period: Duration, task: Box<dyn Fn() + Send + Sync + 'static>) -> Box<dyn TimerHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let due = self.clock.now() + period;
        self.tasks.lock().push(ScheduledTask::FixedDelay { due, period, cancelled: cancelled.clone(), task });
        Box::new(ManualHandle(cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn once_fires_after_advance_and_tick() {
        let clock = FakeClock::new();
        let timer = ManualTimer::new(clock.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let fired2 = fired.clone();
        timer.schedule_once(Duration::from_millis(100), Box::new(move || {
            fired2.fetch_add(1, Ordering::SeqCst);
        }));
        timer.tick();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        clock.advance(Duration::from_millis(100));
        timer.tick();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        timer.tick();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fixed_delay_reschedules_and_cancel_stops_it() {
        let clock = FakeClock::new();
        let timer = ManualTimer::new(clock.clone());
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        let handle = timer.schedule_fixed_delay(Duration::from_millis(50), Box::new(move || {
            count2.fetch_add(1, Ordering::SeqCst);
        }));
        for _ in 0..3 {
            clock.advance(Duration::from_millis(50));
            timer.tick();
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
        handle.cancel();
        clock.advance(Duration::from_millis(50));
        timer.tick();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
