// ── Collaborator boundary ──
//
// The orchestrator never talks to the tunneling engine, the persisted
// stores or the traffic counters directly. Hosts supply implementations
// of these traits, shared as `Arc<dyn Trait>`.

use async_trait::async_trait;

use crate::model::{Category, Direction, Partition, ProxyEndpoint};

/// The non-empty half of an "error-or-empty" collaborator result: a
/// human-readable message shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Interpret a raw collaborator reply where an empty string means
    /// success.
    pub fn from_reply(reply: impl Into<String>) -> Result<(), Self> {
        let reply = reply.into();
        if reply.is_empty() {
            Ok(())
        } else {
            Err(Self::new(reply))
        }
    }
}

impl From<String> for BackendError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BackendError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The tunneling engine: connection control and the route rule store.
#[async_trait]
pub trait TunnelEngine: Send + Sync {
    async fn start(&self) -> BackendResult<()>;

    async fn stop(&self, force: bool) -> BackendResult<()>;

    /// `true` enforces the blacklist, `false` the whitelist.
    async fn set_route_enforcement(&self, enable: bool) -> BackendResult<()>;

    /// `false` bypasses routing rules entirely.
    async fn set_routing_enabled(&self, enable: bool) -> BackendResult<()>;

    async fn list_entries(
        &self,
        partition: Partition,
        category: Category,
    ) -> BackendResult<Vec<String>>;

    async fn add_entry(
        &self,
        partition: Partition,
        category: Category,
        value: &str,
    ) -> BackendResult<()>;

    async fn delete_entry(
        &self,
        partition: Partition,
        category: Category,
        value: &str,
    ) -> BackendResult<()>;

    /// Endpoint of the outbound carrying `tag` traffic.
    async fn proxy_endpoint(&self, tag: &str) -> BackendResult<ProxyEndpoint>;
}

/// Persisted session flags read once at startup.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn active_flag(&self) -> BackendResult<bool>;

    async fn route_enforcement_flag(&self) -> BackendResult<bool>;

    async fn routes_disabled_flag(&self) -> BackendResult<bool>;
}

/// User settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Telemetry cadence in whole seconds, unvalidated.
    async fn poll_interval_seconds(&self) -> BackendResult<i64>;
}

/// Byte counters for tagged traffic.
#[async_trait]
pub trait TrafficSource: Send + Sync {
    /// Snapshot the counters so the following reads are consistent.
    async fn capture_sample(&self) -> BackendResult<()>;

    /// Bytes per second for `tag` in `direction` since the last capture.
    async fn read_rate(&self, tag: &str, direction: Direction) -> BackendResult<u64>;
}
