// ── Route table manager ──
//
// All reads and writes of the route rule set go through here. The cache
// in `RouteStore` is only ever replaced from a fresh backend read: after
// every successful mutation the affected partition is re-fetched, and a
// fetch result is applied only if no newer fetch of the same partition
// was issued while it was in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::backend::{BackendResult, TunnelEngine};
use crate::error::CoreError;
use crate::model::{Category, Partition, RouteAction, RouteKey};
use crate::notify::Notifier;
use crate::store::{PartitionSnapshot, RouteStore};

/// What became of a partition fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Applied to the cache; `changed` lists differed from before.
    Applied { changed: usize },
    /// A newer fetch of the same partition was issued first; dropped.
    Stale,
}

/// Route table operations against the tunneling engine.
#[derive(Clone)]
pub struct RouteManager {
    inner: Arc<RouteInner>,
}

struct RouteInner {
    engine: Arc<dyn TunnelEngine>,
    store: Arc<RouteStore>,
    notifier: Notifier,
    /// Last issued fetch ticket, per partition.
    issued: [AtomicU64; 2],
    /// Held while checking a ticket and applying its result.
    apply_lock: Mutex<()>,
    /// Serializes mutations of the same (partition, category) cell.
    cell_locks: DashMap<RouteKey, Arc<tokio::sync::Mutex<()>>>,
    pending: DashMap<RouteKey, String>,
}

const fn partition_index(partition: Partition) -> usize {
    match partition {
        Partition::Blacklist => 0,
        Partition::Whitelist => 1,
    }
}

impl RouteManager {
    pub(crate) fn new(
        engine: Arc<dyn TunnelEngine>,
        store: Arc<RouteStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            inner: Arc::new(RouteInner {
                engine,
                store,
                notifier,
                issued: [AtomicU64::new(0), AtomicU64::new(0)],
                apply_lock: Mutex::new(()),
                cell_locks: DashMap::new(),
                pending: DashMap::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<RouteStore> {
        &self.inner.store
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Re-read all three categories of `partition` concurrently.
    ///
    /// Categories are independent: a failed read is reported and leaves
    /// that category's cached entries untouched while the others are
    /// applied. Returns the first failure after applying what succeeded.
    pub async fn fetch_list(&self, partition: Partition) -> Result<RefreshOutcome, CoreError> {
        let slot = partition_index(partition);
        let ticket = self.inner.issued[slot].fetch_add(1, Ordering::SeqCst) + 1;
        let engine = &self.inner.engine;

        let (domain, ip, port) = tokio::join!(
            engine.list_entries(partition, Category::Domain),
            engine.list_entries(partition, Category::Ip),
            engine.list_entries(partition, Category::Port),
        );

        let mut snapshot = PartitionSnapshot::default();
        let mut failures = Vec::new();
        for (category, result) in [
            (Category::Domain, domain),
            (Category::Ip, ip),
            (Category::Port, port),
        ] {
            match result {
                Ok(entries) => snapshot.set(category, Some(entries)),
                Err(e) => {
                    let operation = format!("list {partition} {category}");
                    failures.push(CoreError::backend(operation, &e));
                }
            }
        }

        let outcome = {
            let _apply = self
                .inner
                .apply_lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let latest = self.inner.issued[slot].load(Ordering::SeqCst);
            if latest == ticket {
                RefreshOutcome::Applied {
                    changed: self.inner.store.apply_partition_snapshot(partition, snapshot),
                }
            } else {
                RefreshOutcome::Stale
            }
        };

        if outcome == RefreshOutcome::Stale {
            debug!(%partition, ticket, "discarding superseded route fetch");
            return Ok(outcome);
        }

        for err in &failures {
            self.inner.notifier.report(err);
        }
        match failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }

    /// Fetch both partitions concurrently.
    pub async fn fetch_all(&self) -> Result<(), CoreError> {
        let (black, white) = tokio::join!(
            self.fetch_list(Partition::Blacklist),
            self.fetch_list(Partition::Whitelist),
        );
        black.and(white).map(|_| ())
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Add or delete one entry, then re-fetch the partition.
    ///
    /// The backend validates and normalizes `value`; locally only blank
    /// adds are rejected. On failure the cache is left as it was.
    pub async fn mutate(
        &self,
        action: RouteAction,
        partition: Partition,
        category: Category,
        value: &str,
    ) -> Result<RefreshOutcome, CoreError> {
        let key = RouteKey::new(partition, category);

        if action == RouteAction::Add && value.trim().is_empty() {
            let err = CoreError::ValidationFailed {
                message: format!("cannot add an empty {category} to the {partition}"),
            };
            self.inner.notifier.report(&err);
            return Err(err);
        }

        let cell = Arc::clone(self.inner.cell_locks.entry(key).or_default().value());
        let _guard = cell.lock().await;

        if let Err(e) = self.call_mutation(action, key, value).await {
            let err = CoreError::backend(format!("{action} {partition} {category}"), &e);
            self.inner.notifier.report(&err);
            return Err(err);
        }

        info!(%action, %key, value, "route entry updated");
        self.inner.pending.remove_if(&key, |_, pending| pending == value);

        self.fetch_list(partition).await
    }

    async fn call_mutation(
        &self,
        action: RouteAction,
        key: RouteKey,
        value: &str,
    ) -> BackendResult<()> {
        let engine = &self.inner.engine;
        match action {
            RouteAction::Add => engine.add_entry(key.partition, key.category, value).await,
            RouteAction::Delete => engine.delete_entry(key.partition, key.category, value).await,
        }
    }

    // ── Pending input buffers ────────────────────────────────────────

    /// Replace the text typed for a cell but not yet submitted.
    pub fn set_pending_input(&self, key: RouteKey, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.inner.pending.remove(&key);
        } else {
            self.inner.pending.insert(key, value);
        }
    }

    pub fn pending_input(&self, key: RouteKey) -> String {
        self.inner
            .pending
            .get(&key)
            .map(|v| v.value().clone())
            .unwrap_or_default()
    }

    /// Run [`mutate`](Self::mutate) with the cell's pending input.
    pub async fn submit_pending(
        &self,
        action: RouteAction,
        partition: Partition,
        category: Category,
    ) -> Result<RefreshOutcome, CoreError> {
        let value = self.pending_input(RouteKey::new(partition, category));
        self.mutate(action, partition, category, &value).await
    }

    // ── Shared flags ─────────────────────────────────────────────────

    /// Switch enforcement given the mode's *current* checked value.
    ///
    /// Asks the engine to enforce `!checked`, waits for the reply, then
    /// sets the mode to `!checked` whatever the reply was. The mode never
    /// changes before the call resolves.
    pub async fn set_route_enforcement(&self, checked: bool) -> Result<(), CoreError> {
        let target = !checked;
        let result = self.inner.engine.set_route_enforcement(target).await;
        let outcome = result.map_err(|e| {
            let operation = if target { "enable blacklist" } else { "disable blacklist" };
            let err = CoreError::backend(operation, &e);
            self.inner.notifier.report(&err);
            err
        });
        self.inner.store.set_blacklist_enforced(target);
        info!(blacklist_enforced = target, "route enforcement switched");
        outcome
    }

    /// Bypass (or restore) routing rules. The flag follows the request
    /// once the engine has replied.
    pub async fn set_routes_disabled(&self, disabled: bool) -> Result<(), CoreError> {
        let result = self.inner.engine.set_routing_enabled(!disabled).await;
        let outcome = result.map_err(|e| {
            let operation = if disabled { "disable routes" } else { "enable routes" };
            let err = CoreError::backend(operation, &e);
            self.inner.notifier.report(&err);
            err
        });
        self.inner.store.set_routes_disabled(disabled);
        info!(routes_disabled = disabled, "routing bypass switched");
        outcome
    }
}
