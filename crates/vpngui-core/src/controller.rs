// ── Session orchestrator ──
//
// Owns the connection lifecycle and everything coupled to it. Toggle
// requests are single-flight; the telemetry poller runs exactly while
// the session is `Connected`; route operations are delegated to the
// `RouteManager` and run independently of the session.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{BackendResult, ConfigStore, SettingsStore, TrafficSource, TunnelEngine};
use crate::command::{Command, CommandResult};
use crate::config::OrchestratorConfig;
use crate::error::CoreError;
use crate::model::{Partition, ProxyEndpoint, RouteKey, SessionState};
use crate::notify::{Notification, Notifier};
use crate::routes::RouteManager;
use crate::store::RouteStore;
use crate::stream::RouteStream;
use crate::telemetry::{PollHandle, TelemetryPoller};

/// The external collaborators an [`Orchestrator`] drives.
#[derive(Clone)]
pub struct Collaborators {
    pub engine: Arc<dyn TunnelEngine>,
    pub config_store: Arc<dyn ConfigStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub traffic: Arc<dyn TrafficSource>,
}

// ── Orchestrator ─────────────────────────────────────────────────────

/// The main entry point for the presentation layer.
///
/// Cheaply cloneable via `Arc<OrchestratorInner>`. Collaborator failures
/// never abort an operation: they are published on the notification
/// channel and also returned, so inspecting results is optional.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    config: OrchestratorConfig,
    engine: Arc<dyn TunnelEngine>,
    config_store: Arc<dyn ConfigStore>,
    settings: Arc<dyn SettingsStore>,
    notifier: Notifier,
    session: watch::Sender<SessionState>,
    endpoint: watch::Sender<Option<ProxyEndpoint>>,
    /// Held for the whole of a toggle; contenders are rejected.
    toggle_gate: tokio::sync::Mutex<()>,
    poller: TelemetryPoller,
    poll_handle: Mutex<Option<PollHandle>>,
    routes: RouteManager,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Build an orchestrator. Does not talk to any collaborator until
    /// [`initialize()`](Self::initialize) or a command is issued.
    pub fn new(config: OrchestratorConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            engine,
            config_store,
            settings,
            traffic,
        } = collaborators;

        let notifier = Notifier::new(config.notification_capacity);
        let cancel = CancellationToken::new();
        let (session, _) = watch::channel(SessionState::Disconnected);
        let (endpoint, _) = watch::channel(None);

        let poller = TelemetryPoller::new(
            traffic,
            config.telemetry_tag.clone(),
            notifier.clone(),
            cancel.clone(),
        );
        let routes = RouteManager::new(
            Arc::clone(&engine),
            Arc::new(RouteStore::new(false, false)),
            notifier.clone(),
        );

        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                engine,
                config_store,
                settings,
                notifier,
                session,
                endpoint,
                toggle_gate: tokio::sync::Mutex::new(()),
                poller,
                poll_handle: Mutex::new(None),
                routes,
                cancel,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    // ── Startup ──────────────────────────────────────────────────────

    /// Derive the starting state from the persisted stores and load the
    /// route table.
    ///
    /// An active session flag puts the machine straight into `Connected`
    /// (starting the poller) without calling the engine. Unreadable flags
    /// are reported and treated as `false`. The toggle gate is only held
    /// while the session is derived, so a toggle made while the route
    /// lists load goes through. Does nothing after shutdown.
    pub async fn initialize(&self) -> SessionState {
        if self.inner.cancel.is_cancelled() {
            return self.session_state();
        }
        self.restore_session().await;

        let tag = &self.inner.config.telemetry_tag;
        let (endpoint, _) = tokio::join!(
            self.inner.engine.proxy_endpoint(tag),
            self.inner.routes.fetch_all(),
        );
        match endpoint {
            Ok(endpoint) => {
                debug!(
                    address = %endpoint.address,
                    country = %endpoint.country_code,
                    "proxy endpoint"
                );
                self.inner.endpoint.send_replace(Some(endpoint));
            }
            Err(e) => self
                .inner
                .notifier
                .report(&CoreError::backend("read proxy endpoint", &e)),
        }

        self.session_state()
    }

    async fn restore_session(&self) {
        let _gate = self.inner.toggle_gate.lock().await;
        let store = &self.inner.config_store;

        let (active, enforced, bypass) = tokio::join!(
            store.active_flag(),
            store.route_enforcement_flag(),
            store.routes_disabled_flag(),
        );
        let active = self.flag_or_false("read active session flag", active);
        let enforced = self.flag_or_false("read route enforcement flag", enforced);
        let bypass = self.flag_or_false("read routes disabled flag", bypass);

        let route_store = self.inner.routes.store();
        route_store.set_blacklist_enforced(enforced);
        route_store.set_routes_disabled(bypass);

        let settled_off = self.session_state() == SessionState::Disconnected;
        if active && settled_off {
            let interval = self.read_poll_interval().await;
            self.inner.session.send_replace(SessionState::Connected);
            self.start_polling(interval);
            info!("restored active session");
        }
    }

    fn flag_or_false(&self, operation: &str, result: BackendResult<bool>) -> bool {
        result.unwrap_or_else(|e| {
            self.inner.notifier.report(&CoreError::backend(operation, &e));
            false
        })
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Connect when disconnected, disconnect when connected.
    ///
    /// The session always settles in the target state: an engine failure
    /// is reported and returned, but the transition still completes. A
    /// request made while another is in flight is rejected with
    /// [`CoreError::ToggleInProgress`], and any request after
    /// [`shutdown()`](Self::shutdown) with [`CoreError::ShutDown`].
    pub async fn request_toggle(&self) -> Result<SessionState, CoreError> {
        if self.inner.cancel.is_cancelled() {
            let err = CoreError::ShutDown;
            self.inner.notifier.report(&err);
            return Err(err);
        }
        let Ok(_gate) = self.inner.toggle_gate.try_lock() else {
            let err = CoreError::ToggleInProgress;
            self.inner.notifier.report(&err);
            return Err(err);
        };

        match self.session_state().toggle_target() {
            Some(SessionState::Connected) => self.connect().await,
            Some(SessionState::Disconnected) => self.disconnect().await,
            // Unreachable while the gate is held; treat as contention.
            _ => Err(CoreError::ToggleInProgress),
        }
    }

    async fn connect(&self) -> Result<SessionState, CoreError> {
        self.transition(SessionState::Connecting);
        let result = self.inner.engine.start().await;
        let interval = self.read_poll_interval().await;

        self.transition(SessionState::Connected);
        self.start_polling(interval);

        self.settle("start", result, SessionState::Connected)
    }

    async fn disconnect(&self) -> Result<SessionState, CoreError> {
        self.stop_polling();
        self.transition(SessionState::Disconnecting);
        let result = self.inner.engine.stop(true).await;
        self.transition(SessionState::Disconnected);

        self.settle("stop", result, SessionState::Disconnected)
    }

    fn settle(
        &self,
        operation: &str,
        result: BackendResult<()>,
        state: SessionState,
    ) -> Result<SessionState, CoreError> {
        match result {
            Ok(()) => {
                info!(%state, "session settled");
                Ok(state)
            }
            Err(e) => {
                let err = CoreError::backend(operation, &e);
                self.inner.notifier.report(&err);
                Err(err)
            }
        }
    }

    fn transition(&self, next: SessionState) {
        let prev = self.inner.session.send_replace(next);
        debug_assert!(prev.can_transition_to(next), "invalid edge {prev} -> {next}");
        debug!(from = %prev, to = %next, "session transition");
    }

    // ── Telemetry coupling ───────────────────────────────────────────

    /// Configured poll interval, or the fallback when it cannot be read.
    async fn read_poll_interval(&self) -> i64 {
        match self.inner.settings.poll_interval_seconds().await {
            Ok(secs) => secs,
            Err(e) => {
                self.inner
                    .notifier
                    .report(&CoreError::backend("read poll interval", &e));
                self.inner.config.fallback_interval_secs()
            }
        }
    }

    fn start_polling(&self, interval_seconds: i64) {
        let mut slot = self.lock_poll_handle();
        if let Some(prev) = slot.take() {
            self.inner.poller.stop(&prev);
        }

        let started = match self.inner.poller.start(interval_seconds) {
            Err(err @ CoreError::InvalidInterval { .. }) => {
                self.inner.notifier.report(&err);
                self.inner
                    .poller
                    .start(self.inner.config.fallback_interval_secs())
            }
            other => other,
        };
        match started {
            Ok(handle) => *slot = Some(handle),
            Err(err) => self.inner.notifier.report(&err),
        }
    }

    fn stop_polling(&self) {
        let handle = self.lock_poll_handle().take();
        if let Some(handle) = handle {
            self.inner.poller.stop(&handle);
        }
    }

    fn lock_poll_handle(&self) -> std::sync::MutexGuard<'_, Option<PollHandle>> {
        self.inner
            .poll_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ── Routing ──────────────────────────────────────────────────────

    /// See [`RouteManager::set_route_enforcement`].
    pub async fn set_route_enforcement(&self, checked: bool) -> Result<(), CoreError> {
        self.inner.routes.set_route_enforcement(checked).await
    }

    /// See [`RouteManager::set_routes_disabled`].
    pub async fn set_routes_disabled(&self, disabled: bool) -> Result<(), CoreError> {
        self.inner.routes.set_routes_disabled(disabled).await
    }

    pub fn routes(&self) -> &RouteManager {
        &self.inner.routes
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a user action.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let routes = &self.inner.routes;
        match cmd {
            Command::Toggle => self.request_toggle().await.map(CommandResult::Session),
            Command::SetRouteEnforcement { checked } => {
                routes.set_route_enforcement(checked).await?;
                Ok(CommandResult::Enforcement {
                    blacklist_enforced: routes.store().blacklist_enforced(),
                })
            }
            Command::SetRoutesDisabled { disabled } => {
                routes.set_routes_disabled(disabled).await?;
                Ok(CommandResult::RoutesDisabled { disabled })
            }
            Command::Mutate {
                action,
                partition,
                category,
                value,
            } => routes
                .mutate(action, partition, category, &value)
                .await
                .map(CommandResult::Routes),
            Command::SubmitPending {
                action,
                partition,
                category,
            } => routes
                .submit_pending(action, partition, category)
                .await
                .map(CommandResult::Routes),
            Command::Refresh {
                partition: Some(partition),
            } => routes.fetch_list(partition).await.map(CommandResult::Routes),
            Command::Refresh { partition: None } => {
                routes.fetch_all().await.map(|()| CommandResult::Ok)
            }
        }
    }

    // ── Shutdown ─────────────────────────────────────────────────────

    /// Stop the poller and cancel all background work. The session state
    /// is left as is; the engine is not told to stop. Later toggles are
    /// refused.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let _ = self.lock_poll_handle().take();
        self.inner.poller.shutdown().await;
        debug!("orchestrator shut down");
    }

    // ── State observation ────────────────────────────────────────────

    pub fn session_state(&self) -> SessionState {
        *self.inner.session.borrow()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<SessionState> {
        self.inner.session.subscribe()
    }

    pub fn poller(&self) -> &TelemetryPoller {
        &self.inner.poller
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_active()
    }

    pub fn endpoint(&self) -> Option<ProxyEndpoint> {
        self.inner.endpoint.borrow().clone()
    }

    pub fn subscribe_endpoint(&self) -> watch::Receiver<Option<ProxyEndpoint>> {
        self.inner.endpoint.subscribe()
    }

    pub fn route_store(&self) -> &Arc<RouteStore> {
        self.inner.routes.store()
    }

    pub fn route_stream(&self, key: RouteKey) -> RouteStream {
        self.inner.routes.store().stream(key)
    }

    pub fn blacklist_enforced(&self) -> bool {
        self.inner.routes.store().blacklist_enforced()
    }

    pub fn routes_disabled(&self) -> bool {
        self.inner.routes.store().routes_disabled()
    }

    pub fn partition_len(&self, partition: Partition) -> usize {
        self.inner.routes.store().partition_len(partition)
    }

    /// Subscribe to user-facing notifications.
    pub fn notifications(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.inner.notifier.subscribe()
    }
}
