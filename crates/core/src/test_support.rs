// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::descriptor::{Descriptor, ScopeTag};
use crate::id::DescriptorId;
use crate::level::Level;
use crate::locator::Locator;
use crate::service::{ActivationError, ActivationMode, DestructionError, ServiceHandle};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// A plain data descriptor for tests.
#[derive(Clone)]
pub struct FakeDescriptor {
    pub id: DescriptorId,
    pub level: Option<Level>,
    pub scope: ScopeTag,
    pub injects: Vec<DescriptorId>,
}

impl FakeDescriptor {
    pub fn new(id: &str, level: i64) -> Self {
        Self {
            id: DescriptorId::new(id),
            level: Some(Level::new(level)),
            scope: ScopeTag::run_level(),
            injects: Vec::new(),
        }
    }

    pub fn depends_on(mut self, other: &str) -> Self {
        self.injects.push(DescriptorId::new(other));
        self
    }
}

impl Descriptor for FakeDescriptor {
    fn id(&self) -> DescriptorId {
        self.id.clone()
    }

    fn declared_level(&self) -> Option<Level> {
        self.level
    }

    fn scope(&self) -> ScopeTag {
        self.scope.clone()
    }

    fn injection_points(&self) -> Vec<DescriptorId> {
        self.injects.clone()
    }
}

/// A one-shot latch a test can use to hold a `FakeServiceHandle`'s
/// activation or destruction open until explicitly released, giving
/// deterministic control over cross-thread ordering without relying on
/// real sleeps.
#[derive(Default)]
pub struct Latch {
    released: Mutex<bool>,
    cancelled: AtomicBool,
    condvar: Condvar,
}

impl Latch {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn release(&self) {
        *self.released.lock() = true;
        self.condvar.notify_all();
    }

    /// Request cooperative cancellation; a thread currently parked in
    /// `wait` wakes and observes `is_cancelled() == true`.
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Block until released or cancelled.
    pub fn wait(&self) {
        let mut guard = self.released.lock();
        while !*guard && !self.cancelled.load(Ordering::SeqCst) {
            self.condvar.wait(&mut guard);
        }
    }
}

/// Scripted outcome for `FakeServiceHandle::activate`.
#[derive(Clone)]
pub enum ActivateScript {
    Succeed,
    Fail(String),
    /// Raise `WouldBlock` when invoked in non-blocking mode; succeed when
    /// invoked in blocking mode (models a dependency busy elsewhere).
    WouldBlockUnlessForced,
    /// Block on the given latch before deciding the outcome above.
    WaitThen(Arc<Latch>, Box<ActivateScript>),
}

pub struct FakeServiceHandle {
    descriptor: Arc<FakeDescriptor>,
    hint: Mutex<Option<ActivationMode>>,
    script: Mutex<ActivateScript>,
    destroy_fail: Option<String>,
    destroy_latch: Option<Arc<Latch>>,
    activate_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
    activation_order: Option<Arc<Mutex<Vec<DescriptorId>>>>,
}

impl FakeServiceHandle {
    pub fn new(descriptor: FakeDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            hint: Mutex::new(None),
            script: Mutex::new(ActivateScript::Succeed),
            destroy_fail: None,
            destroy_latch: None,
            activate_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            activation_order: None,
        }
    }

    pub fn with_script(mut self, script: ActivateScript) -> Self {
        self.script = Mutex::new(script);
        self
    }

    pub fn with_destroy_failure(mut self, message: impl Into<String>) -> Self {
        self.destroy_fail = Some(message.into());
        self
    }

    pub fn with_destroy_latch(mut self, latch: Arc<Latch>) -> Self {
        self.destroy_latch = Some(latch);
        self
    }

    pub fn recording_into(mut self, order: Arc<Mutex<Vec<DescriptorId>>>) -> Self {
        self.activation_order = Some(order);
        self
    }

    pub fn activate_calls(&self) -> usize {
        self.activate_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }
}

/// Minimal `Display + Error` wrapper so scripted failure messages can be
/// boxed as `dyn std::error::Error` without pulling in `anyhow`.
#[derive(Debug)]
pub struct Msg(pub String);

impl std::fmt::Display for Msg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for Msg {}

fn resolve(script: &ActivateScript, mode: ActivationMode) -> Result<(), ActivationError> {
    match script {
        ActivateScript::Succeed => Ok(()),
        ActivateScript::Fail(msg) => Err(ActivationError::Other(Box::new(Msg(msg.clone())))),
        ActivateScript::WouldBlockUnlessForced => match mode {
            ActivationMode::Blocking => Ok(()),
            ActivationMode::NonBlocking => Err(ActivationError::WouldBlock),
        },
        ActivateScript::WaitThen(latch, then) => {
            latch.wait();
            if latch.is_cancelled() {
                Err(ActivationError::WasCancelled)
            } else {
                resolve(then, mode)
            }
        }
    }
}

impl ServiceHandle for FakeServiceHandle {
    fn descriptor(&self) -> Arc<dyn Descriptor> {
        self.descriptor.clone()
    }

    fn set_hint(&self, mode: ActivationMode) {
        *self.hint.lock() = Some(mode);
    }

    fn clear_hint(&self) {
        *self.hint.lock() = None;
    }

    fn activate(&self) -> Result<(), ActivationError> {
        self.activate_calls.fetch_add(1, Ordering::SeqCst);
        let mode = (*self.hint.lock()).unwrap_or(ActivationMode::Blocking);
        let script = self.script.lock().clone();
        let result = resolve(&script, mode);
        if result.is_ok() {
            if let Some(order) = &self.activation_order {
                order.lock().push(self.descriptor.id.clone());
            }
        }
        result
    }

    fn destroy(&self) -> Result<(), DestructionError> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latch) = &self.destroy_latch {
            latch.wait();
        }
        match &self.destroy_fail {
            Some(msg) => Err(DestructionError(Box::new(Msg(msg.clone())))),
            None => Ok(()),
        }
    }

    fn request_hard_cancel(&self) {
        if let ActivateScript::WaitThen(latch, _) = &*self.script.lock() {
            latch.request_cancel();
        }
        if let Some(latch) = &self.destroy_latch {
            latch.request_cancel();
        }
    }
}

/// In-memory `Locator` double keyed by level, with a descriptor registry
/// for the would-block pre-check's transitive lookups.
#[derive(Default)]
pub struct FakeLocator {
    by_level: Mutex<HashMap<i64, Vec<Arc<dyn ServiceHandle>>>>,
    descriptors: Mutex<HashMap<DescriptorId, Arc<dyn Descriptor>>>,
}

impl FakeLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: Arc<dyn ServiceHandle>) {
        let descriptor = handle.descriptor();
        let level = descriptor.declared_level().expect("registered service must declare a level");
        self.descriptors.lock().insert(descriptor.id(), descriptor);
        self.by_level.lock().entry(level.value()).or_default().push(handle);
    }
}

impl Locator for FakeLocator {
    fn snapshot_ascent(&self, level: Level) -> Vec<Arc<dyn ServiceHandle>> {
        self.by_level.lock().get(&level.value()).cloned().unwrap_or_default()
    }

    fn snapshot_descent(&self, level: Level) -> Vec<Arc<dyn ServiceHandle>> {
        let mut services = self.snapshot_ascent(level);
        services.reverse();
        services
    }

    fn descriptor_of(&self, id: &DescriptorId) -> Option<Arc<dyn Descriptor>> {
        self.descriptors.lock().get(id).cloned()
    }
}
