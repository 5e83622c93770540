// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DownDriver: descend one level at a time, tearing down in reverse
//! activation order.

use super::DriverOutcome;
use crate::descent::DescentQueue;
use crate::job::Job;
use rl_core::{JobControl, Level};
use std::sync::Arc;

pub(crate) struct DownDriver {
    job: Arc<Job>,
    /// `true` for a synthesized cleanup descent (ascent abort/cancel
    /// rollback): no `onProgress`/`onCancelled` dispatch, no repurpose
    /// checks, no job-level completion signalling of its own. `onError`
    /// still fires either way.
    suppress_callbacks: bool,
    /// `Some` for a cleanup descent, which targets a fixed floor rather
    /// than the job's (possibly still-changing) proposed level.
    fixed_target: Option<Level>,
    /// For a cleanup descent: the level that was mid-ascent when the abort
    /// happened. Services at this level may already have activated (the
    /// pool drains its whole queue even after a `GoToNextLowerLevelAndStop`
    /// decision), even though `ctx.current()` was never advanced to it, so
    /// teardown must start here rather than at `ctx.current()`.
    start_override: Option<Level>,
}

impl DownDriver {
    pub(crate) fn new(job: Arc<Job>, suppress_callbacks: bool) -> Self {
        Self { job, suppress_callbacks, fixed_target: None, start_override: None }
    }

    /// A synthesized cleanup descent tearing down `scattering` (the level
    /// the aborted ascent was scattering across) and anything below it down
    /// to `floor`, run as part of an ascent's error or cancellation
    /// rollback.
    pub(crate) fn cleanup(job: Arc<Job>, scattering: Level, floor: Level) -> Self {
        Self { job, suppress_callbacks: true, fixed_target: Some(floor), start_override: Some(scattering) }
    }

    pub(crate) fn run(mut self) -> DriverOutcome {
        loop {
            let current = self.start_override.take().unwrap_or_else(|| self.job.ctx.current());
            let target = match self.fixed_target {
                Some(t) => t,
                None => self.job.proposed_level(),
            };
            if current <= target {
                return DriverOutcome::Done;
            }

            let k = current;
            let next_level = k.pred();
            let span = tracing::info_span!("descent", job_id = %self.job.run_id(), level = %k);
            let _guard = span.enter();
            self.job.ctx.mark_level_achieved(next_level);
            let services = self.job.ctx.snapshot_descent(k);
            let queue = DescentQueue::new(self.job.ctx.clone(), self.job.clone(), k, services);
            let outcome = queue.run();

            if !self.suppress_callbacks {
                self.job.dispatch_progress(next_level);
            }

            if outcome.clamp {
                tracing::warn!("destruction failure clamped descent at this level");
                return DriverOutcome::Done;
            }
            tracing::info!("level torn down");

            if !self.suppress_callbacks && self.job.take_repurpose_if_flagged() {
                return DriverOutcome::Repurposed;
            }
        }
    }
}
