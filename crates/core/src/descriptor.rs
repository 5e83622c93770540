// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Descriptor: the opaque handle to a registered service that the core
//! reasons about, without ever owning registration itself.

use crate::id::DescriptorId;
use crate::level::Level;

/// Tag identifying which scope a descriptor lives in. The would-block
/// pre-check only walks descriptors tagged with the run-level scope; other
/// scopes are opaque to this core (they belong to the DI container).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeTag(pub String);

impl ScopeTag {
    /// The scope every levelled service is expected to live in.
    pub fn run_level() -> Self {
        Self("RunLevel".to_string())
    }
}

impl std::fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle to a registered service, projected down to the three facts
/// the orchestrator core needs: its declared level (if it participates in
/// levelling at all), its scope, and the descriptors it injects.
pub trait Descriptor: Send + Sync {
    fn id(&self) -> DescriptorId;

    /// `None` if the service does not participate in levelling.
    fn declared_level(&self) -> Option<Level>;

    fn scope(&self) -> ScopeTag;

    /// Descriptors referenced by this descriptor's injection points. Used
    /// only by the would-block pre-check; may be empty.
    fn injection_points(&self) -> Vec<DescriptorId>;
}
