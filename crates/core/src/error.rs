// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds shared across the core and engine crates.

use crate::id::DescriptorId;
use crate::level::Level;
use std::sync::Arc;
use thiserror::Error;

/// A single activation failure, captured for aggregation into a
/// `JobFailure`. The underlying cause is flattened to a message at capture
/// time so the failure stays `Clone + Send + Sync` across listener
/// dispatch and pool accumulation.
#[derive(Debug, Clone, Error)]
#[error("activation failed for {descriptor}: {cause}")]
pub struct ActivationFailure {
    pub descriptor: DescriptorId,
    pub level: Level,
    pub cause: Arc<str>,
}

/// Aggregate failure returned from a failed `Job::wait`. Carries every
/// activation failure accumulated during the ascent that triggered the
/// rollback.
#[derive(Debug, Clone, Error)]
#[error("job failed: {} activation failure(s) at/above level {level}", errors.len())]
pub struct JobFailure {
    pub level: Level,
    pub errors: Vec<ActivationFailure>,
}

impl JobFailure {
    pub fn new(level: Level, errors: Vec<ActivationFailure>) -> Self {
        Self { level, errors }
    }

    pub fn errors(&self) -> &[ActivationFailure] {
        &self.errors
    }
}

/// Errors raised directly by the public orchestrator/Job API.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// `submit` was called while another job is in flight.
    #[error("another transition is already in progress")]
    Busy,
    /// `changeProposedLevel` was called outside a listener callback on the
    /// same job, or on a job that is already done.
    #[error("changeProposedLevel is only legal from inside a listener callback on the same job")]
    IllegalState,
}
