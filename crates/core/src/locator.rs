// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The DI-container collaborator consumed by the Context.
//!
//! Registration, injection-point resolution proper, per-scope instance
//! caches, and reification of lazy descriptors are all out of scope: the
//! orchestrator core only ever asks the locator for a snapshot at a level
//! or for one descriptor's facts.

use crate::descriptor::Descriptor;
use crate::id::DescriptorId;
use crate::level::Level;
use crate::service::ServiceHandle;
use std::sync::Arc;

/// Snapshot-by-level query plus injection-point lookup, as consumed from
/// the container.
pub trait Locator: Send + Sync {
    /// All services declared at `level`, in no particular order (the
    /// Sorter chain imposes the scheduling order for ascent).
    fn snapshot_ascent(&self, level: Level) -> Vec<Arc<dyn ServiceHandle>>;

    /// Active services at `level`, in reverse-activation order.
    fn snapshot_descent(&self, level: Level) -> Vec<Arc<dyn ServiceHandle>>;

    /// Look up a descriptor by identity, for the would-block pre-check's
    /// transitive injection-point walk. `None` if the
    /// descriptor is unknown to the container.
    fn descriptor_of(&self, id: &DescriptorId) -> Option<Arc<dyn Descriptor>>;
}
