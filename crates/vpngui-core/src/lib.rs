//! Session, telemetry and route orchestration for the vpngui client.
//!
//! This crate sits between a presentation layer and the external
//! collaborators that actually move packets and persist state:
//!
//! - **[`Orchestrator`]**: Central facade. Drives the connection through
//!   `Disconnected → Connecting → Connected → Disconnecting`, rejects
//!   overlapping toggle requests, and starts/stops the telemetry poller so
//!   that it runs exactly while the session is `Connected`.
//!
//! - **[`TelemetryPoller`]**: A single cancellable periodic loop that
//!   captures traffic counters, reads uplink/downlink rates for the proxy
//!   tag, and publishes both the raw [`TelemetrySample`] and formatted
//!   rate strings.
//!
//! - **[`RouteManager`]** / **[`RouteStore`]**: Blacklist/whitelist ×
//!   domain/IP/port rule lists mirrored from the tunneling engine. The
//!   cache is replaced wholesale after every mutation and superseded
//!   fetches are dropped.
//!
//! - **Collaborator traits** ([`backend`]): [`TunnelEngine`],
//!   [`ConfigStore`], [`SettingsStore`] and [`TrafficSource`], implemented
//!   by the host.
//!
//! Collaborator failures never abort an operation. They are converted to
//! [`Notification`]s on a broadcast channel and also returned as
//! [`CoreError`] for callers that care.

pub mod backend;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod format;
pub mod model;
pub mod notify;
pub mod routes;
pub mod store;
pub mod stream;
pub mod telemetry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::{
    BackendError, BackendResult, ConfigStore, SettingsStore, TrafficSource, TunnelEngine,
};
pub use command::{Command, CommandResult};
pub use config::OrchestratorConfig;
pub use controller::{Collaborators, Orchestrator};
pub use error::CoreError;
pub use format::format_rate;
pub use model::{
    Category, Direction, Partition, ProxyEndpoint, RouteAction, RouteKey, SessionState,
    TelemetryRates, TelemetrySample,
};
pub use notify::{Notification, NotificationLevel};
pub use routes::{RefreshOutcome, RouteManager};
pub use store::{PartitionSnapshot, RouteStore};
pub use stream::{RouteStream, RouteWatchStream};
pub use telemetry::{PollHandle, TelemetryPoller};
