// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The timer seam.
//!
//! Must accept scheduled one-shot tasks and fixed-delay tasks and support
//! task cancellation with at-most-once firing semantics.

use std::time::Duration;

/// A handle to a scheduled task. Dropping the handle does not cancel the
/// task; call `cancel` explicitly.
pub trait TimerHandle: Send + Sync {
    /// Cancel the task. At-most-once firing: if the task already fired (or
    /// is firing concurrently), this is a no-op and returns `false`.
    fn cancel(&self) -> bool;
}

pub trait Timer: Send + Sync {
    /// Run `task` once after `delay`.
    fn schedule_once(
        &self,
        delay: Duration,
        task: Box<dyn FnOnce() + Send + 'static>,
    ) -> Box<dyn TimerHandle>;

    /// Run `task` repeatedly every `period`, starting after `period`.
    fn schedule_fixed_delay(
        &self,
        period: Duration,
        task: Box<dyn Fn() + Send + Sync + 'static>,
    ) -> Box<dyn TimerHandle>;
}
