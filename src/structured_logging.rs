use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

/// Global correlation ID generator
static CORRELATION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub fn new_correlation_id() -> u64 {
    CORRELATION_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// JSON launch events on the `structured` target, tied together by a correlation id
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    correlation_id: u64,
    component: String,
}

impl StructuredLogger {
    pub fn new(component: &str) -> Self {
        Self {
            correlation_id: new_correlation_id(),
            component: component.to_string(),
        }
    }

    pub fn correlation_id(&self) -> u64 {
        self.correlation_id
    }

    fn log_structured(&self, level: &str, message: &str, extra_fields: serde_json::Value) {
        let log_entry = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": level,
            "component": self.component,
            "correlation_id": self.correlation_id,
            "message": message,
            "fields": extra_fields
        });

        let log_string = log_entry.to_string();

        match level {
            "DEBUG" => debug!(target: "structured", "{}", log_string),
            "WARN" => warn!(target: "structured", "{}", log_string),
            "ERROR" => error!(target: "structured", "{}", log_string),
            _ => info!(target: "structured", "{}", log_string),
        }
    }

    pub fn info(&self, message: &str, fields: serde_json::Value) {
        self.log_structured("INFO", message, fields);
    }

    pub fn warn(&self, message: &str, fields: serde_json::Value) {
        self.log_structured("WARN", message, fields);
    }

    pub fn error(&self, message: &str, fields: serde_json::Value) {
        self.log_structured("ERROR", message, fields);
    }

    pub fn log_launch_started(&self, mint: &str, authority: &str, tier: &str) {
        self.info("launch_started", json!({
            "mint": mint,
            "authority": authority,
            "tier": tier,
            "action": "launch_start"
        }));
    }

    pub fn log_metadata_uploaded(&self, uri: &str, verified: bool) {
        self.info("metadata_uploaded", json!({
            "uri": uri,
            "verified": verified,
            "action": "metadata_upload"
        }));
    }

    pub fn log_precondition_failed(&self, error: &str) {
        self.error("precondition_failed", json!({
            "error": error,
            "action": "launch_abort"
        }));
    }

    pub fn log_step_success(&self, step: &str, signature: &str, latency_ms: u64) {
        self.info("step_success", json!({
            "step": step,
            "signature": signature,
            "latency_ms": latency_ms,
            "action": "step_success"
        }));
    }

    pub fn log_step_failure(&self, step: &str, error: &str) {
        self.warn("step_failure", json!({
            "step": step,
            "error": error,
            "action": "step_failure"
        }));
    }

    pub fn log_launch_finished(&self, mint: &str, base_units: u64, failed_steps: usize) {
        self.info("launch_finished", json!({
            "mint": mint,
            "base_units": base_units,
            "failed_steps": failed_steps,
            "action": "launch_end"
        }));
    }
}
