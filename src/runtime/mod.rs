//! Runtime dependencies injected into controllers when they are attached.
//!
//! A [`RuntimeContext`] is handed from a host to its manager, from the
//! manager to each child on attach, and from each child to its own child
//! manager, so a whole controller tree shares one logger, one metrics
//! accumulator and one audit sink.

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::logging::{LogLevel, Logger, event_with_fields};
use crate::metrics::{LifecycleMetrics, MetricSnapshot};

pub mod audit;

use audit::{LifecycleAudit, LifecycleAuditEvent, NullLifecycleAudit};

/// Configuration knobs for a controller tree.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Optional structured logger used by controllers and managers.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared by every controller in the tree.
    pub metrics: Option<Arc<Mutex<LifecycleMetrics>>>,
    /// Audit sink receiving ordered lifecycle checkpoints.
    pub audit: Arc<dyn LifecycleAudit>,
    /// Label attached to log events so several hosts can share a sink.
    pub host_label: String,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            audit: Arc::new(NullLifecycleAudit),
            host_label: "host".to_string(),
            metrics_target: "room::lifecycle.metrics".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn LifecycleAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_host_label(mut self, label: impl Into<String>) -> Self {
        self.host_label = label.into();
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(LifecycleMetrics::new())));
        }
    }

    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<LifecycleMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// Shared, cheaply cloned handle over a [`RuntimeConfig`].
#[derive(Clone)]
pub struct RuntimeContext {
    config: Rc<RuntimeConfig>,
}

impl RuntimeContext {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config: Rc::new(config),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn host_label(&self) -> &str {
        &self.config.host_label
    }

    pub(crate) fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref().filter(|l| l.enabled(level)) {
            let host = (String::from("host"), Value::from(self.host_label()));
            let event = event_with_fields(
                level,
                target,
                message,
                std::iter::once(host).chain(fields),
            );
            let _ = logger.log_event(event);
        }
    }

    pub(crate) fn record_metric(&self, record: impl FnOnce(&mut LifecycleMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                record(&mut guard);
            }
        }
    }

    pub(crate) fn audit(&self, event: LifecycleAuditEvent) {
        self.config.audit.record(event);
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        metrics.lock().ok().map(|guard| guard.snapshot())
    }

    /// Log the current metrics snapshot, if both metrics and a logger are configured.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(snapshot)) =
            (self.config.logger.as_ref(), self.metrics_snapshot())
        {
            let _ = logger.log_event(snapshot.to_log_event(&self.config.metrics_target));
        }
    }
}

impl Default for RuntimeContext {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;

    #[test]
    fn log_is_silent_without_logger() {
        let ctx = RuntimeContext::default();
        ctx.log(LogLevel::Info, "room::test", "nothing", std::iter::empty());
        assert!(ctx.metrics_snapshot().is_none());
    }

    #[test]
    fn log_tags_host_label() {
        let sink = MemorySink::new();
        let ctx = RuntimeContext::new(
            RuntimeConfig::default()
                .with_logger(Logger::new(sink.clone()))
                .with_host_label("main-window"),
        );
        ctx.log(LogLevel::Info, "room::test", "hello", std::iter::empty());

        let events = sink.events();
        assert_eq!(events[0].field("host"), Some(&Value::from("main-window")));
    }

    #[test]
    fn metrics_flow_into_snapshot_event() {
        let sink = MemorySink::new();
        let mut config = RuntimeConfig::default().with_logger(Logger::new(sink.clone()));
        config.enable_metrics();
        let ctx = RuntimeContext::new(config);

        ctx.record_metric(|metrics| metrics.record_step());
        ctx.emit_metrics();

        assert_eq!(ctx.metrics_snapshot().map(|s| s.steps), Some(1));
        assert_eq!(sink.messages(), vec!["lifecycle_metrics".to_string()]);
    }
}
