//! Health check contract.

use async_trait::async_trait;
use serde::Serialize;

/// Outcome of one component's health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The component is operating normally.
    Healthy,
    /// The component needs operator attention.
    Degraded,
}

/// Health report for one component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Overall status.
    pub status: HealthStatus,
    /// Name of the component that was probed.
    pub component: String,
    /// Human-readable detail, present when degraded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ComponentHealth {
    /// A healthy report for `component`.
    pub fn healthy(component: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            component: component.into(),
            message: None,
        }
    }

    /// A degraded report for `component` with a diagnostic message.
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            component: component.into(),
            message: Some(message.into()),
        }
    }

    /// Whether the component reported healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

/// A periodically pollable health probe.
///
/// Checks never fail: inability to gather data is reported through the
/// returned status, not an error. Probes are side-effect free and
/// schedulable at any interval.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Stable name identifying the probed component.
    fn component_name(&self) -> &str;

    /// Run the probe.
    async fn check(&self) -> ComponentHealth;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_reports_carry_their_message() {
        let health = ComponentHealth::degraded("BrowseStart", "queue stalled");
        assert!(!health.is_healthy());
        assert_eq!(health.message.as_deref(), Some("queue stalled"));

        let json = serde_json::to_string(&health).expect("serialize");
        assert!(json.contains("\"status\":\"degraded\""));
        assert!(json.contains("\"component\":\"BrowseStart\""));
    }

    #[test]
    fn healthy_reports_omit_the_message() {
        let health = ComponentHealth::healthy("BrowseStart");
        assert!(health.is_healthy());

        let json = serde_json::to_string(&health).expect("serialize");
        assert!(!json.contains("message"));
    }
}
