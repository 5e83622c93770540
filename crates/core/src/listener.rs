// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External observer surface: progress-start, progress, cancelled, error,
//! plus the pluggable Sorter.

use crate::error::CoreError;
use crate::id::DescriptorId;
use crate::level::Level;
use crate::service::ServiceHandle;
use std::sync::Arc;

/// Minimal job surface exposed to listener callbacks: enough to read
/// direction/levels and to repurpose the job mid-flight. Kept as a trait
/// (rather than a concrete type) so `rl-core` does not depend on
/// `rl-engine`; `rl-engine::Job` implements it.
pub trait JobControl: Send + Sync {
    fn proposed_level(&self) -> Level;
    fn current_level(&self) -> Level;

    /// Permitted only from inside a listener callback on this same job.
    /// Returns the level that was proposed before this call.
    fn change_proposed_level(&self, new_level: Level) -> Result<Level, CoreError>;
}

/// Which phase an `ErrorInfo` was raised during.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Ascent,
    Descent,
}

/// Everything `onError` needs to decide how to proceed.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    pub descriptor: DescriptorId,
    pub level: Level,
    pub phase: Phase,
    pub cause: Arc<str>,
}

/// The action a listener requests in response to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorAction {
    /// Continue with the level.
    #[default]
    Ignore,
    /// During ascent: abort this level and descend back one. During
    /// descent: cap the descent at the current level.
    GoToNextLowerLevelAndStop,
}

impl ErrorAction {
    /// Fold two listeners' decisions for the same failure: any
    /// `GoToNextLowerLevelAndStop` wins over `Ignore`.
    pub fn fold(self, other: Self) -> Self {
        match (self, other) {
            (ErrorAction::GoToNextLowerLevelAndStop, _) | (_, ErrorAction::GoToNextLowerLevelAndStop) => {
                ErrorAction::GoToNextLowerLevelAndStop
            }
            _ => ErrorAction::Ignore,
        }
    }

    pub fn fold_all(actions: impl IntoIterator<Item = ErrorAction>) -> ErrorAction {
        actions.into_iter().fold(ErrorAction::Ignore, ErrorAction::fold)
    }
}

/// Observer of a job's progress, errors, and cancellation.
///
/// Default methods are no-ops / `Ignore` so a listener only needs to
/// override what it cares about.
pub trait RunLevelListener: Send + Sync {
    /// Happens-after all services at `level` have completed activation
    /// (ascent) or destruction (descent produced `level = achieved - 1`).
    fn on_progress(&self, _job: &dyn JobControl, _level: Level) {}

    /// Raised for each activation/destruction failure. The effective
    /// action for a given failure is the fold (`ErrorAction::fold_all`) of
    /// every listener's returned action.
    fn on_error(&self, _job: &dyn JobControl, _info: &ErrorInfo) -> ErrorAction {
        ErrorAction::Ignore
    }

    /// Happens-after descent to `level` has completed its destructions.
    fn on_cancelled(&self, _job: &dyn JobControl, _level: Level) {}
}

/// Observer invoked once, synchronously, from inside `Context::submit`,
/// before the job's driver starts.
pub trait ProgressStartedListener: Send + Sync {
    fn on_progress_started(&self, job: &dyn JobControl, current_level: Level);
}

/// Pluggable reordering of a level's service list before scheduling.
/// Returning `None` means "no change".
pub trait Sorter: Send + Sync {
    fn sort(&self, level: Level, services: &[Arc<dyn ServiceHandle>]) -> Option<Vec<Arc<dyn ServiceHandle>>>;
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
