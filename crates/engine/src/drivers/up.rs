// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UpDriver: ascend one level at a time via the bounded AscentWorkerPool,
//! rolling back through a synthesized cleanup descent on failure or
//! cancellation.

use super::{DownDriver, DriverOutcome};
use crate::job::Job;
use crate::pool::{AscentWorkerPool, PoolOutcome};
use rl_core::{JobControl, JobFailure};
use std::sync::Arc;

pub(crate) struct UpDriver {
    job: Arc<Job>,
}

impl UpDriver {
    pub(crate) fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    pub(crate) fn run(self) -> DriverOutcome {
        loop {
            let current = self.job.ctx.current();
            let proposed = self.job.proposed_level();
            if proposed <= current {
                return DriverOutcome::Done;
            }

            // `k` is the level currently being scattered across the pool:
            // "workingOn", not yet achieved (the ascent-cancel
            // safe floor is `workingOn - 1`, i.e. `k.pred()`).
            let k = current.succ();
            let span = tracing::info_span!("ascent", job_id = %self.job.run_id(), level = %k);
            let _guard = span.enter();
            let services = self.job.ctx.snapshot_ascent(k);
            let ordered = self.job.apply_sorters(k, services);
            let pool = AscentWorkerPool::new(self.job.ctx.clone(), self.job.clone(), k, ordered);

            match pool.run() {
                PoolOutcome::Cancelled => {
                    tracing::info!("ascent cancelled, rolling back");
                    let floor = k.pred();
                    DownDriver::cleanup(self.job.clone(), k, floor).run();
                    self.job.dispatch_cancelled(floor);
                    return DriverOutcome::Cancelled;
                }
                PoolOutcome::Completed { failures } if !failures.is_empty() => {
                    tracing::warn!(failures = failures.len(), "level failed to activate, rolling back");
                    let floor = k.pred();
                    DownDriver::cleanup(self.job.clone(), k, floor).run();
                    return DriverOutcome::Failed(JobFailure::new(k, failures));
                }
                PoolOutcome::Completed { .. } => {
                    tracing::info!("level activated");
                    self.job.ctx.mark_level_achieved(k);
                    self.job.dispatch_progress(k);
                    if self.job.take_repurpose_if_flagged() {
                        return DriverOutcome::Repurposed;
                    }
                }
            }
        }
    }
}
