// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration. Loading this from a host's own
//! config file (flags, TOML, env) is the host's responsibility; this crate
//! only defines the shape and derives `serde` so hosts can deserialize it
//! with whatever format they already use.

/// `{ maxThreads, useThreads, cancelTimeoutMillis }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrchestratorConfig {
    /// 0 means single-thread cooperative mode: every driver runs to
    /// completion on the submitting thread.
    pub max_threads: u32,
    /// Whether to use a real thread dispatcher at all. `false` forces
    /// cooperative mode regardless of `max_threads`.
    pub use_threads: bool,
    /// Hard-cancel deadline, in milliseconds. `0` disables hard-cancel
    /// (cancellation still happens, but never forcibly).
    pub cancel_timeout_millis: u64,
}

impl OrchestratorConfig {
    pub fn cooperative() -> Self {
        Self {
            max_threads: 0,
            use_threads: false,
            cancel_timeout_millis: 0,
        }
    }

    pub fn threaded(max_threads: u32, cancel_timeout_millis: u64) -> Self {
        Self {
            max_threads,
            use_threads: true,
            cancel_timeout_millis,
        }
    }

    /// Whether drivers should run inline on the submitting/calling thread
    /// rather than handing work to the dispatcher.
    pub fn is_cooperative(&self) -> bool {
        !self.use_threads || self.max_threads == 0
    }

    pub fn cancel_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.cancel_timeout_millis)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::threaded(4, 5_000)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
