// ── Telemetry samples ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::format::format_rate;

/// Traffic direction queried from the traffic collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Uplink,
    Downlink,
}

/// Latest byte-rate pair for the telemetry tag. No history is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub uplink: u64,
    pub downlink: u64,
}

impl TelemetrySample {
    pub fn rates(&self) -> TelemetryRates {
        TelemetryRates {
            uplink: format_rate(self.uplink),
            downlink: format_rate(self.downlink),
        }
    }
}

/// Human-readable rendering of a [`TelemetrySample`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryRates {
    pub uplink: String,
    pub downlink: String,
}

impl Default for TelemetryRates {
    fn default() -> Self {
        TelemetrySample::default().rates()
    }
}
