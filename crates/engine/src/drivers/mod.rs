// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UpDriver and DownDriver: the per-direction state machines a Job hands
//! control to for one leg of a transition.

mod down;
mod up;

pub(crate) use down::DownDriver;
pub(crate) use up::UpDriver;

use rl_core::JobFailure;

/// What a driver settled on after running one leg (ascent or descent) to
/// completion, abort, or interruption.
pub(crate) enum DriverOutcome {
    /// Reached the target level cleanly.
    Done,
    /// A listener retargeted the job mid-leg and the direction flipped;
    /// the Job's run loop will construct the opposite driver next.
    Repurposed,
    /// An activation failure with effective action `GoToNextLowerLevelAndStop`
    /// aborted the ascent; the synthesized cleanup descent has already run.
    Failed(JobFailure),
    /// `Job::cancel()` was observed mid-ascent; the synthesized cleanup
    /// descent has already run.
    Cancelled,
}
