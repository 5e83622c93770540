// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-facing error and outcome types layered over `rl_core::error`.

use rl_core::JobFailure;
use thiserror::Error;

/// What `Job::wait` resolved to without a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The job reached its (possibly retargeted) proposed level.
    Done,
    /// The caller's `changeProposedLevel` (or another listener's) flipped
    /// the ascent/descent direction while this wait was pending. The job is
    /// still running; call `wait` again to observe its eventual outcome.
    Repurposed,
}

/// What `Job::wait` resolved to when it did not return `Ok`.
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("wait timed out before the job settled")]
    TimedOut,
    #[error(transparent)]
    Failed(#[from] JobFailure),
}
