// ── Domain model ──
//
// Canonical types shared by the orchestrator, its collaborators and
// the presentation layer consuming its watch channels.

pub mod endpoint;
pub mod route;
pub mod session;
pub mod telemetry;

pub use endpoint::ProxyEndpoint;
pub use route::{Category, Partition, RouteAction, RouteKey};
pub use session::SessionState;
pub use telemetry::{Direction, TelemetryRates, TelemetrySample};
