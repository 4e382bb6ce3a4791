//! Lifecycle audit utilities.
//!
//! Audit sinks observe every attach, committed step, hook dispatch and
//! add/remove performed by the runtime, in the exact order they happen.
//! Records carry a stage, the controller involved and structured details so
//! callers can log, buffer, or assert on the global ordering of a tree.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

use crate::controller::ControllerId;
use crate::lifecycle::LifecycleEvent;

/// Distinct checkpoints emitted by controllers and managers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAuditStage {
    /// A controller received its runtime context from a manager.
    ControllerAttached,
    /// A controller committed one adjacent state step.
    StepCommitted,
    /// A lifecycle hook returned.
    HookDispatched,
    /// A child registration completed, including its catch-up.
    ChildAdded,
    /// A child was unregistered and driven to `Destroyed`.
    ChildRemoved,
    /// A controller finished its destruction hook.
    ControllerDestroyed,
    /// A re-entrant target request was parked behind an in-flight step.
    TargetDeferred,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct LifecycleAuditEvent {
    pub timestamp: SystemTime,
    pub stage: LifecycleAuditStage,
    pub controller: Option<ControllerId>,
    pub event: Option<LifecycleEvent>,
    pub details: Vec<(String, Value)>,
}

impl LifecycleAuditEvent {
    fn new(stage: LifecycleAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            controller: None,
            event: None,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Builder helper to append fields ergonomically.
pub struct LifecycleAuditEventBuilder {
    event: LifecycleAuditEvent,
}

impl LifecycleAuditEventBuilder {
    pub fn new(stage: LifecycleAuditStage) -> Self {
        Self {
            event: LifecycleAuditEvent::new(stage),
        }
    }

    pub fn controller(mut self, id: ControllerId) -> Self {
        self.event.controller = Some(id);
        self
    }

    pub fn event(mut self, event: LifecycleEvent) -> Self {
        self.event.event = Some(event);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> LifecycleAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait LifecycleAudit: Send + Sync {
    fn record(&self, event: LifecycleAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullLifecycleAudit;

impl LifecycleAudit for NullLifecycleAudit {
    fn record(&self, _event: LifecycleAuditEvent) {}
}

/// Buffers every audit record in memory.
#[derive(Debug, Default)]
pub struct RecordingAudit {
    events: Mutex<Vec<LifecycleAuditEvent>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LifecycleAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// `(controller, event)` pairs for every dispatched hook, in firing order.
    pub fn hook_trace(&self) -> Vec<(ControllerId, LifecycleEvent)> {
        self.events()
            .into_iter()
            .filter(|record| record.stage == LifecycleAuditStage::HookDispatched)
            .filter_map(|record| Some((record.controller?, record.event?)))
            .collect()
    }

    pub fn stage_count(&self, stage: LifecycleAuditStage) -> usize {
        self.events()
            .iter()
            .filter(|record| record.stage == stage)
            .count()
    }
}

impl LifecycleAudit for RecordingAudit {
    fn record(&self, event: LifecycleAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
