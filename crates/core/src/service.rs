// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ServiceHandle: the bound (descriptor, lazy instance slot) pair the
//! AscentWorkerPool and DescentQueue drive.

use crate::descriptor::Descriptor;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// Per-call hint passed into `activate`, set into the handle's scratch slot
/// before activation and cleared afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    /// The worker has no more work to steal; it may block on a dependency
    /// already being built elsewhere.
    Blocking,
    /// The worker may still steal other queued work; activation must not
    /// block on an in-progress dependency and should raise `WouldBlock`
    /// instead.
    NonBlocking,
}

/// Failure raised by `ServiceHandle::activate`.
#[derive(Debug)]
pub enum ActivationError {
    /// Raised by the container when a non-blocking activation would have to
    /// wait on a dependency another thread is currently building. Internal
    /// only; never surfaced to listeners.
    WouldBlock,
    /// Raised when a hard cancel aborted an in-flight activation. Internal
    /// only; treated as a completed (non-error) handle.
    WasCancelled,
    /// Any other activation failure, surfaced to `onError`.
    Other(Box<dyn StdError + Send + Sync>),
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationError::WouldBlock => write!(f, "would block"),
            ActivationError::WasCancelled => write!(f, "was cancelled"),
            ActivationError::Other(e) => write!(f, "{e}"),
        }
    }
}

impl StdError for ActivationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ActivationError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Failure raised by `ServiceHandle::destroy`. Destruction failures never
/// carry a `WouldBlock`/`WasCancelled` distinction; they are always
/// surfaced to `onError`, which may clamp the descent floor but never
/// aborts the destruction itself.
#[derive(Debug)]
pub struct DestructionError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for DestructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for DestructionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_ref())
    }
}

/// A bound pair of (descriptor, lazy instance slot). Implemented by the DI
/// container; consumed by the AscentWorkerPool and DescentQueue.
pub trait ServiceHandle: Send + Sync {
    fn descriptor(&self) -> Arc<dyn Descriptor>;

    /// Set the per-call scratch hint used to tell `activate` which mode it
    /// is running in.
    fn set_hint(&self, mode: ActivationMode);

    /// Clear the scratch hint after activation completes (success or not).
    fn clear_hint(&self);

    /// Produce or return the instance. May fail, may signal `WouldBlock`.
    fn activate(&self) -> Result<(), ActivationError>;

    /// Tear the instance down. May fail generically.
    fn destroy(&self) -> Result<(), DestructionError>;

    /// Ask an in-flight `activate`/`destroy` on another thread to abort as
    /// soon as possible, raising `ActivationError::WasCancelled` (or simply
    /// returning early for `destroy`). Called by `Context::hard_cancel_one`
    /// after the hard-cancel deadline expires.
    /// Cooperative: a handle that cannot be interrupted may leave this a
    /// no-op, in which case hard-cancel degrades to "wait for it anyway".
    fn request_hard_cancel(&self) {}
}
