// ── In-memory collaborators ──
//
// Scriptable fakes for the four collaborator traits. Every knob is set
// through a `std::sync::Mutex` that is never held across an await.

#![allow(clippy::unwrap_used, dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use vpngui_core::{
    BackendError, BackendResult, Category, Collaborators, ConfigStore, Direction, Notification,
    NotificationLevel, Orchestrator, OrchestratorConfig, Partition, ProxyEndpoint, RouteKey,
    SettingsStore, TrafficSource, TunnelEngine,
};

// ── Helpers ─────────────────────────────────────────────────────────

pub fn key(partition: Partition, category: Category) -> RouteKey {
    RouteKey::new(partition, category)
}

/// Let spawned tasks run without moving the paused clock meaningfully.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

/// Drain every notification currently queued.
pub fn drain(rx: &mut broadcast::Receiver<Arc<Notification>>) -> Vec<(NotificationLevel, String)> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push((n.level, n.message.clone()));
    }
    out
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

// ── Tunneling engine ────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeEngine {
    pub calls: Mutex<Vec<String>>,
    pub lists: Mutex<HashMap<RouteKey, Vec<String>>>,
    pub failures: Mutex<HashMap<&'static str, String>>,
    pub failing_lists: Mutex<Vec<RouteKey>>,
    pub delays: Mutex<HashMap<&'static str, Duration>>,
    pub endpoint: Mutex<Option<ProxyEndpoint>>,
}

impl FakeEngine {
    pub fn fail(&self, op: &'static str, message: &str) {
        self.failures.lock().unwrap().insert(op, message.to_owned());
    }

    pub fn succeed(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    pub fn delay(&self, op: &'static str, delay: Duration) {
        self.delays.lock().unwrap().insert(op, delay);
    }

    pub fn seed(&self, key: RouteKey, entries: &[&str]) {
        self.lists
            .lock()
            .unwrap()
            .insert(key, entries.iter().map(|s| (*s).to_owned()).collect());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str, detail: String) -> (Duration, BackendResult<()>) {
        self.calls.lock().unwrap().push(detail);
        let delay = self.delays.lock().unwrap().get(op).copied().unwrap_or_default();
        let result = match self.failures.lock().unwrap().get(op) {
            Some(message) => Err(BackendError::new(message.clone())),
            None => Ok(()),
        };
        (delay, result)
    }
}

#[async_trait]
impl TunnelEngine for FakeEngine {
    async fn start(&self) -> BackendResult<()> {
        let (delay, result) = self.record("start", "start".into());
        pause(delay).await;
        result
    }

    async fn stop(&self, force: bool) -> BackendResult<()> {
        let (delay, result) = self.record("stop", format!("stop(force={force})"));
        pause(delay).await;
        result
    }

    async fn set_route_enforcement(&self, enable: bool) -> BackendResult<()> {
        let (delay, result) = self.record(
            "set_route_enforcement",
            format!("set_route_enforcement({enable})"),
        );
        pause(delay).await;
        result
    }

    async fn set_routing_enabled(&self, enable: bool) -> BackendResult<()> {
        let (delay, result) =
            self.record("set_routing_enabled", format!("set_routing_enabled({enable})"));
        pause(delay).await;
        result
    }

    async fn list_entries(
        &self,
        partition: Partition,
        category: Category,
    ) -> BackendResult<Vec<String>> {
        let key = RouteKey::new(partition, category);
        let (delay, _) = self.record("list", format!("list {key}"));
        let entries = self.lists.lock().unwrap().get(&key).cloned().unwrap_or_default();
        let failing = self.failing_lists.lock().unwrap().contains(&key);
        pause(delay).await;
        if failing {
            return Err(BackendError::new(format!("cannot read {key}")));
        }
        Ok(entries)
    }

    async fn add_entry(
        &self,
        partition: Partition,
        category: Category,
        value: &str,
    ) -> BackendResult<()> {
        let key = RouteKey::new(partition, category);
        let (delay, result) = self.record("add", format!("add {key} {value}"));
        pause(delay).await;
        result?;
        self.lists
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push(value.trim().to_lowercase());
        Ok(())
    }

    async fn delete_entry(
        &self,
        partition: Partition,
        category: Category,
        value: &str,
    ) -> BackendResult<()> {
        let key = RouteKey::new(partition, category);
        let (delay, result) = self.record("delete", format!("delete {key} {value}"));
        pause(delay).await;
        result?;
        let mut lists = self.lists.lock().unwrap();
        let list = lists.entry(key).or_default();
        match list.iter().position(|v| v == value) {
            Some(idx) => {
                list.remove(idx);
                Ok(())
            }
            None => Err(BackendError::new(format!("{value} not found"))),
        }
    }

    async fn proxy_endpoint(&self, tag: &str) -> BackendResult<ProxyEndpoint> {
        let (_, result) = self.record("proxy_endpoint", format!("proxy_endpoint({tag})"));
        result?;
        self.endpoint
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BackendError::new(format!("no outbound tagged {tag}")))
    }
}

// ── Config and settings stores ──────────────────────────────────────

#[derive(Default)]
pub struct FakeConfig {
    pub active: AtomicBool,
    pub blacklist_enforced: AtomicBool,
    pub routes_disabled: AtomicBool,
    pub broken: AtomicBool,
}

impl FakeConfig {
    fn read(&self, flag: &AtomicBool) -> BackendResult<bool> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(BackendError::new("config unreadable"));
        }
        Ok(flag.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl ConfigStore for FakeConfig {
    async fn active_flag(&self) -> BackendResult<bool> {
        self.read(&self.active)
    }

    async fn route_enforcement_flag(&self) -> BackendResult<bool> {
        self.read(&self.blacklist_enforced)
    }

    async fn routes_disabled_flag(&self) -> BackendResult<bool> {
        self.read(&self.routes_disabled)
    }
}

pub struct FakeSettings {
    pub interval: Mutex<BackendResult<i64>>,
}

impl Default for FakeSettings {
    fn default() -> Self {
        Self {
            interval: Mutex::new(Ok(1)),
        }
    }
}

impl FakeSettings {
    pub fn set_interval(&self, secs: i64) {
        *self.interval.lock().unwrap() = Ok(secs);
    }
}

#[async_trait]
impl SettingsStore for FakeSettings {
    async fn poll_interval_seconds(&self) -> BackendResult<i64> {
        self.interval.lock().unwrap().clone()
    }
}

// ── Traffic source ──────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeTraffic {
    pub captures: AtomicUsize,
    pub uplink: Mutex<u64>,
    pub downlink: Mutex<u64>,
    pub delay: Mutex<Duration>,
    pub failing: AtomicBool,
    pub tags: Mutex<Vec<String>>,
}

impl FakeTraffic {
    pub fn set_rates(&self, uplink: u64, downlink: u64) {
        *self.uplink.lock().unwrap() = uplink;
        *self.downlink.lock().unwrap() = downlink;
    }

    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrafficSource for FakeTraffic {
    async fn capture_sample(&self) -> BackendResult<()> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        pause(delay).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(BackendError::new("stats service unavailable"));
        }
        Ok(())
    }

    async fn read_rate(&self, tag: &str, direction: Direction) -> BackendResult<u64> {
        self.tags.lock().unwrap().push(format!("{tag}:{direction}"));
        let rate = match direction {
            Direction::Uplink => *self.uplink.lock().unwrap(),
            Direction::Downlink => *self.downlink.lock().unwrap(),
        };
        Ok(rate)
    }
}

// ── Harness ─────────────────────────────────────────────────────────

pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub config: Arc<FakeConfig>,
    pub settings: Arc<FakeSettings>,
    pub traffic: Arc<FakeTraffic>,
    pub orch: Orchestrator,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    pub fn with_config(cfg: OrchestratorConfig) -> Self {
        let engine = Arc::new(FakeEngine::default());
        let config = Arc::new(FakeConfig::default());
        let settings = Arc::new(FakeSettings::default());
        let traffic = Arc::new(FakeTraffic::default());

        let orch = Orchestrator::new(
            cfg,
            Collaborators {
                engine: engine.clone(),
                config_store: config.clone(),
                settings: settings.clone(),
                traffic: traffic.clone(),
            },
        );

        Self {
            engine,
            config,
            settings,
            traffic,
            orch,
        }
    }
}
