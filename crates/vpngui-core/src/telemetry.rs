// ── Telemetry poller ──
//
// Owns the single periodic capture/read timer. Each start gets a fresh
// generation number and a child cancellation token; a firing whose
// generation is no longer current, or whose token was cancelled while
// the collaborator calls were in flight, is dropped without publishing.
// Publishing happens under the same lock `stop` takes, so nothing lands
// after `stop` returns.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::backend::{BackendError, TrafficSource};
use crate::error::CoreError;
use crate::model::{Direction, TelemetryRates, TelemetrySample};
use crate::notify::Notifier;

/// Opaque token identifying one started poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHandle {
    generation: u64,
}

struct ActivePoll {
    generation: u64,
    period: Duration,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Periodic telemetry loop with at most one live timer.
#[derive(Clone)]
pub struct TelemetryPoller {
    inner: Arc<PollerInner>,
}

struct PollerInner {
    traffic: Arc<dyn TrafficSource>,
    tag: String,
    notifier: Notifier,
    sample: watch::Sender<TelemetrySample>,
    rates: watch::Sender<TelemetryRates>,
    active: watch::Sender<bool>,
    generation: AtomicU64,
    current: Mutex<Option<ActivePoll>>,
    cancel: CancellationToken,
}

impl TelemetryPoller {
    pub(crate) fn new(
        traffic: Arc<dyn TrafficSource>,
        tag: String,
        notifier: Notifier,
        cancel: CancellationToken,
    ) -> Self {
        let (sample, _) = watch::channel(TelemetrySample::default());
        let (rates, _) = watch::channel(TelemetryRates::default());
        let (active, _) = watch::channel(false);
        Self {
            inner: Arc::new(PollerInner {
                traffic,
                tag,
                notifier,
                sample,
                rates,
                active,
                generation: AtomicU64::new(0),
                current: Mutex::new(None),
                cancel,
            }),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Start polling every `interval_seconds`, firing immediately.
    ///
    /// Any previously started loop is stopped first. Must be called from
    /// within a Tokio runtime; the first firing happens on the spawned
    /// task, never inside this call. Fails with [`CoreError::ShutDown`]
    /// once the owning orchestrator has been shut down.
    pub fn start(&self, interval_seconds: i64) -> Result<PollHandle, CoreError> {
        let secs = u64::try_from(interval_seconds)
            .ok()
            .filter(|s| *s > 0)
            .ok_or(CoreError::InvalidInterval {
                seconds: interval_seconds,
            })?;
        let period = Duration::from_secs(secs);

        let mut current = self.lock_current();
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }
        if let Some(prev) = current.take() {
            debug!(generation = prev.generation, "replacing active poll loop");
            prev.cancel.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = self.inner.cancel.child_token();
        let task = tokio::spawn(poll_task(
            Arc::clone(&self.inner),
            generation,
            period,
            cancel.clone(),
        ));

        *current = Some(ActivePoll {
            generation,
            period,
            cancel,
            task,
        });
        drop(current);

        self.inner.active.send_replace(true);
        info!(interval_secs = secs, generation, "telemetry polling started");
        Ok(PollHandle { generation })
    }

    /// Stop the loop identified by `handle`. Stale or repeated handles
    /// are ignored.
    pub fn stop(&self, handle: &PollHandle) {
        let stopped = {
            let mut current = self.lock_current();
            let matches = current
                .as_ref()
                .is_some_and(|a| a.generation == handle.generation);
            if matches { current.take() } else { None }
        };

        match stopped {
            Some(active) => {
                active.cancel.cancel();
                self.inner.active.send_replace(false);
                info!(generation = active.generation, "telemetry polling stopped");
            }
            None => trace!(generation = handle.generation, "stop on inactive handle ignored"),
        }
    }

    /// Cancel the active loop, if any, and wait for its task to exit.
    ///
    /// The parent token must already be cancelled so no new loop can
    /// start behind this one.
    pub(crate) async fn shutdown(&self) {
        let active = self.lock_current().take();
        if let Some(active) = active {
            active.cancel.cancel();
            self.inner.active.send_replace(false);
            let _ = active.task.await;
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.lock_current().is_some()
    }

    /// Period of the active loop.
    pub fn active_interval(&self) -> Option<Duration> {
        self.lock_current().as_ref().map(|a| a.period)
    }

    pub fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.inner.active.subscribe()
    }

    pub fn sample(&self) -> TelemetrySample {
        *self.inner.sample.borrow()
    }

    pub fn subscribe_sample(&self) -> watch::Receiver<TelemetrySample> {
        self.inner.sample.subscribe()
    }

    pub fn rates(&self) -> TelemetryRates {
        self.inner.rates.borrow().clone()
    }

    pub fn subscribe_rates(&self) -> watch::Receiver<TelemetryRates> {
        self.inner.rates.subscribe()
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<ActivePoll>> {
        self.inner.lock_current()
    }
}

impl PollerInner {
    fn lock_current(&self) -> MutexGuard<'_, Option<ActivePoll>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, generation: u64) -> bool {
        is_live(self.lock_current().as_ref(), generation)
    }

    async fn collect(&self) -> Result<TelemetrySample, BackendError> {
        self.traffic.capture_sample().await?;
        let (uplink, downlink) = tokio::join!(
            self.traffic.read_rate(&self.tag, Direction::Uplink),
            self.traffic.read_rate(&self.tag, Direction::Downlink),
        );
        Ok(TelemetrySample {
            uplink: uplink?,
            downlink: downlink?,
        })
    }

    /// Publish `sample` if `generation` is still the live loop.
    fn publish_if_current(&self, generation: u64, sample: TelemetrySample) -> bool {
        let current = self.lock_current();
        if !is_live(current.as_ref(), generation) {
            return false;
        }
        self.sample.send_replace(sample);
        self.rates.send_replace(sample.rates());
        true
    }
}

fn is_live(current: Option<&ActivePoll>, generation: u64) -> bool {
    current.is_some_and(|a| a.generation == generation && !a.cancel.is_cancelled())
}

// ── Background task ──────────────────────────────────────────────────

async fn poll_task(
    inner: Arc<PollerInner>,
    generation: u64,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failing = false;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let result = inner.collect().await;

                if cancel.is_cancelled() || !inner.is_current(generation) {
                    trace!(generation, "discarding stale telemetry result");
                    break;
                }

                match result {
                    Ok(sample) => {
                        if !inner.publish_if_current(generation, sample) {
                            trace!(generation, "discarding stale telemetry result");
                            break;
                        }
                        failing = false;
                    }
                    Err(e) if failing => debug!(error = %e, "telemetry read still failing"),
                    Err(e) => {
                        failing = true;
                        inner.notifier.report(&CoreError::backend("read traffic", &e));
                    }
                }
            }
        }
    }

    debug!(generation, "telemetry poll task exiting");
}
