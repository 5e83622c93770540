// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default `Dispatcher` implementations.

use rl_core::Dispatcher;
use std::thread;

/// One OS thread per submitted task, detached. The caller (AscentWorkerPool,
/// DescentQueue) already bounds how many tasks it ever submits concurrently
/// (`min(N, T) - 1`), so this dispatcher does not need its own semaphore.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDispatcher;

impl Dispatcher for ThreadDispatcher {
    fn spawn(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        let built = thread::Builder::new().name("rl-worker".into()).spawn(task);
        if let Err(e) = built {
            tracing::error!(error = %e, "failed to spawn worker thread");
        }
    }
}

/// Runs every task synchronously on the calling thread. Models the
/// non-threaded cooperative execution mode: combined with
/// `OrchestratorConfig::is_cooperative`, the AscentWorkerPool and
/// DescentQueue never actually call into this (they run their single
/// worker inline instead), but a host may still hand this in explicitly.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn spawn(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        task();
    }
}
