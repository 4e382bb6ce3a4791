use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;

/// Counters accumulated across every controller sharing a runtime context.
#[derive(Debug, Default, Clone)]
pub struct LifecycleMetrics {
    steps: u64,
    hooks: u64,
    children_added: u64,
    children_removed: u64,
    destroyed: u64,
    deferred_targets: u64,
}

impl LifecycleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_step(&mut self) {
        self.steps = self.steps.saturating_add(1);
    }

    pub fn record_hook(&mut self) {
        self.hooks = self.hooks.saturating_add(1);
    }

    pub fn record_child_added(&mut self) {
        self.children_added = self.children_added.saturating_add(1);
    }

    pub fn record_child_removed(&mut self) {
        self.children_removed = self.children_removed.saturating_add(1);
    }

    pub fn record_destroyed(&mut self) {
        self.destroyed = self.destroyed.saturating_add(1);
    }

    pub fn record_deferred_target(&mut self) {
        self.deferred_targets = self.deferred_targets.saturating_add(1);
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            steps: self.steps,
            hooks: self.hooks,
            children_added: self.children_added,
            children_removed: self.children_removed,
            destroyed: self.destroyed,
            deferred_targets: self.deferred_targets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub steps: u64,
    pub hooks: u64,
    pub children_added: u64,
    pub children_removed: u64,
    pub destroyed: u64,
    pub deferred_targets: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "lifecycle_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("steps".to_string(), json!(self.steps));
        map.insert("hooks".to_string(), json!(self.hooks));
        map.insert("children_added".to_string(), json!(self.children_added));
        map.insert("children_removed".to_string(), json!(self.children_removed));
        map.insert("destroyed".to_string(), json!(self.destroyed));
        map.insert("deferred_targets".to_string(), json!(self.deferred_targets));
        map
    }
}
