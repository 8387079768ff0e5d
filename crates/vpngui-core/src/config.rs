// ── Runtime orchestrator configuration ──
//
// Tuning knobs for the orchestrator itself. Persisted user settings live
// behind the `SettingsStore` collaborator; the host builds an
// `OrchestratorConfig` and hands it in.

use std::time::Duration;

/// Configuration for a single [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Traffic tag whose rates are polled and whose outbound endpoint is
    /// published.
    pub telemetry_tag: String,
    /// Poll cadence used when the settings store reports an unusable
    /// interval on connect.
    pub fallback_poll_interval: Duration,
    /// Capacity of the notification broadcast channel.
    pub notification_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            telemetry_tag: "proxy".into(),
            fallback_poll_interval: Duration::from_secs(1),
            notification_capacity: 64,
        }
    }
}

impl OrchestratorConfig {
    /// Fallback interval in whole seconds, never below one.
    pub(crate) fn fallback_interval_secs(&self) -> i64 {
        i64::try_from(self.fallback_poll_interval.as_secs())
            .unwrap_or(i64::MAX)
            .max(1)
    }
}
