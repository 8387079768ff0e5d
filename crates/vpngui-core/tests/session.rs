#![allow(clippy::unwrap_used)]

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;
use vpngui_core::{
    Category, Command, CommandResult, CoreError, NotificationLevel, OrchestratorConfig, Partition,
    ProxyEndpoint, SessionState,
};

use common::{drain, key, settle, Harness};

// ── Toggle ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn connect_starts_poller_with_configured_interval() {
    let h = Harness::new();
    h.settings.set_interval(5);

    let state = h.orch.request_toggle().await.unwrap();

    assert_eq!(state, SessionState::Connected);
    assert_eq!(h.orch.session_state(), SessionState::Connected);
    assert!(h.orch.is_polling());
    assert_eq!(h.orch.poller().active_interval(), Some(Duration::from_secs(5)));
    assert_eq!(h.engine.calls(), vec!["start"]);
}

#[tokio::test(start_paused = true)]
async fn disconnect_forces_stop_and_stops_poller() {
    let h = Harness::new();
    h.orch.request_toggle().await.unwrap();

    let state = h.orch.request_toggle().await.unwrap();

    assert_eq!(state, SessionState::Disconnected);
    assert!(!h.orch.is_polling());
    assert_eq!(h.engine.calls(), vec!["start", "stop(force=true)"]);
}

#[tokio::test(start_paused = true)]
async fn failed_engine_calls_still_reach_target_state() {
    let h = Harness::new();
    let mut rx = h.orch.notifications();
    h.engine.fail("start", "xray binary missing");
    h.engine.fail("stop", "process already gone");

    let err = h.orch.request_toggle().await.unwrap_err();
    assert_eq!(
        err,
        CoreError::BackendCallFailed {
            operation: "start".into(),
            message: "xray binary missing".into(),
        }
    );
    assert_eq!(h.orch.session_state(), SessionState::Connected);
    assert!(h.orch.is_polling());

    h.orch.request_toggle().await.unwrap_err();
    assert_eq!(h.orch.session_state(), SessionState::Disconnected);
    assert!(!h.orch.is_polling());

    assert_eq!(
        drain(&mut rx),
        vec![
            (
                NotificationLevel::Error,
                "start failed: xray binary missing".to_owned()
            ),
            (
                NotificationLevel::Error,
                "stop failed: process already gone".to_owned()
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn overlapping_toggle_is_rejected() {
    let h = Harness::new();
    let mut rx = h.orch.notifications();
    h.engine.delay("start", Duration::from_secs(2));

    let orch = h.orch.clone();
    let first = tokio::spawn(async move { orch.request_toggle().await });
    settle().await;

    assert_eq!(h.orch.session_state(), SessionState::Connecting);
    assert!(!h.orch.is_polling());
    assert_eq!(
        h.orch.request_toggle().await,
        Err(CoreError::ToggleInProgress)
    );

    assert_eq!(first.await.unwrap(), Ok(SessionState::Connected));
    assert_eq!(h.engine.calls(), vec!["start"]);
    assert_eq!(drain(&mut rx)[0].0, NotificationLevel::Warning);
}

#[tokio::test(start_paused = true)]
async fn poller_runs_exactly_while_connected() {
    let h = Harness::new();
    h.engine.delay("start", Duration::from_secs(1));
    h.engine.delay("stop", Duration::from_secs(1));
    let mut states = h.orch.subscribe_session();

    for _ in 0..3 {
        let orch = h.orch.clone();
        let task = tokio::spawn(async move { orch.request_toggle().await });
        settle().await;
        assert_eq!(*states.borrow_and_update(), SessionState::Connecting);
        assert!(!h.orch.is_polling());
        task.await.unwrap().unwrap();
        assert_eq!(*states.borrow_and_update(), SessionState::Connected);
        assert!(h.orch.is_polling());

        let orch = h.orch.clone();
        let task = tokio::spawn(async move { orch.request_toggle().await });
        settle().await;
        assert_eq!(*states.borrow_and_update(), SessionState::Disconnecting);
        assert!(!h.orch.is_polling());
        task.await.unwrap().unwrap();
        assert_eq!(*states.borrow_and_update(), SessionState::Disconnected);
        assert!(!h.orch.is_polling());
    }
}

// ── Poll interval resolution ────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn invalid_interval_falls_back_with_warning() {
    let h = Harness::with_config(OrchestratorConfig {
        fallback_poll_interval: Duration::from_secs(3),
        ..OrchestratorConfig::default()
    });
    let mut rx = h.orch.notifications();
    h.settings.set_interval(0);

    h.orch.request_toggle().await.unwrap();

    assert!(h.orch.is_polling());
    assert_eq!(h.orch.poller().active_interval(), Some(Duration::from_secs(3)));
    let notes = drain(&mut rx);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].0, NotificationLevel::Warning);
    assert!(notes[0].1.contains("0s"));
}

#[tokio::test(start_paused = true)]
async fn unreadable_interval_falls_back_with_error() {
    let h = Harness::new();
    let mut rx = h.orch.notifications();
    *h.settings.interval.lock().unwrap() =
        Err(vpngui_core::BackendError::new("settings file locked"));

    h.orch.request_toggle().await.unwrap();

    assert_eq!(h.orch.poller().active_interval(), Some(Duration::from_secs(1)));
    assert_eq!(
        drain(&mut rx),
        vec![(
            NotificationLevel::Error,
            "read poll interval failed: settings file locked".to_owned()
        )]
    );
}

// ── Initialisation ──────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn active_flag_restores_connected_without_engine_start() {
    let h = Harness::new();
    h.config.active.store(true, Ordering::SeqCst);
    h.config.blacklist_enforced.store(true, Ordering::SeqCst);
    h.config.routes_disabled.store(true, Ordering::SeqCst);
    *h.engine.endpoint.lock().unwrap() = Some(ProxyEndpoint {
        address: "203.0.113.7".into(),
        country_code: "NL".into(),
    });
    h.engine
        .seed(key(Partition::Blacklist, Category::Domain), &["ads.example", "track.example"]);
    h.engine.seed(key(Partition::Whitelist, Category::Ip), &["10.0.0.0/8"]);

    let state = h.orch.initialize().await;

    assert_eq!(
        *h.orch.route_store().entries(key(Partition::Blacklist, Category::Domain)),
        vec!["ads.example", "track.example"]
    );
    assert_eq!(
        *h.orch.route_store().entries(key(Partition::Whitelist, Category::Ip)),
        vec!["10.0.0.0/8"]
    );
    assert_eq!(h.orch.partition_len(Partition::Blacklist), 2);
    assert_eq!(h.orch.partition_len(Partition::Whitelist), 1);
    assert_eq!(state, SessionState::Connected);
    assert!(h.orch.is_polling());
    assert!(h.orch.blacklist_enforced());
    assert!(h.orch.routes_disabled());
    assert_eq!(h.orch.endpoint().unwrap().country_code, "NL");
    assert!(!h.engine.calls().contains(&"start".to_owned()));
    assert!(h.engine.calls().contains(&"proxy_endpoint(proxy)".to_owned()));
}

#[tokio::test(start_paused = true)]
async fn toggle_is_accepted_while_startup_lists_load() {
    let h = Harness::new();
    let mut rx = h.orch.notifications();
    h.engine.delay("list", Duration::from_secs(5));

    let orch = h.orch.clone();
    let init = tokio::spawn(async move { orch.initialize().await });
    settle().await;

    assert_eq!(h.orch.request_toggle().await, Ok(SessionState::Connected));
    assert!(h.orch.is_polling());
    assert_eq!(init.await.unwrap(), SessionState::Connected);
    assert!(
        drain(&mut rx)
            .iter()
            .all(|(level, _)| *level != NotificationLevel::Warning)
    );
}

#[tokio::test(start_paused = true)]
async fn unreadable_config_starts_disconnected() {
    let h = Harness::new();
    let mut rx = h.orch.notifications();
    h.config.broken.store(true, Ordering::SeqCst);
    h.config.active.store(true, Ordering::SeqCst);

    let state = h.orch.initialize().await;

    assert_eq!(state, SessionState::Disconnected);
    assert!(!h.orch.is_polling());
    assert!(h.orch.endpoint().is_none());
    // Three flags plus the missing endpoint.
    let errors = drain(&mut rx)
        .into_iter()
        .filter(|(level, _)| *level == NotificationLevel::Error)
        .count();
    assert_eq!(errors, 4);
}

// ── Commands and shutdown ───────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn toggle_command_reports_session_state() {
    let h = Harness::new();

    let result = h.orch.execute(Command::Toggle).await.unwrap();

    assert_eq!(result, CommandResult::Session(SessionState::Connected));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_polling() {
    let h = Harness::new();
    h.orch.request_toggle().await.unwrap();
    settle().await;
    let captures = h.traffic.captures();

    h.orch.shutdown().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(!h.orch.is_polling());
    assert_eq!(h.traffic.captures(), captures);
}

#[tokio::test(start_paused = true)]
async fn toggle_after_shutdown_is_refused() {
    let h = Harness::new();
    let mut rx = h.orch.notifications();
    h.orch.shutdown().await;

    assert_eq!(h.orch.request_toggle().await, Err(CoreError::ShutDown));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.orch.session_state(), SessionState::Disconnected);
    assert!(!h.orch.is_polling());
    assert!(!*h.orch.poller().subscribe_active().borrow());
    assert_eq!(h.traffic.captures(), 0);
    assert!(h.engine.calls().is_empty());
    assert_eq!(
        drain(&mut rx),
        vec![(
            NotificationLevel::Warning,
            "The orchestrator has been shut down".to_owned()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn initialize_after_shutdown_does_nothing() {
    let h = Harness::new();
    h.config.active.store(true, Ordering::SeqCst);
    h.orch.shutdown().await;

    assert_eq!(h.orch.initialize().await, SessionState::Disconnected);
    assert!(!h.orch.is_polling());
    assert!(h.engine.calls().is_empty());
}
