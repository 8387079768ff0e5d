// ── Route table store ──
//
// The six (partition, category) lists and the two routing flags shared
// by every partition. Flags are only written by the route manager.

use std::sync::Arc;

use tokio::sync::watch;

use super::route_list::RouteList;
use crate::model::{Partition, RouteKey};
use crate::stream::RouteStream;

/// Six route lists plus the two shared routing flags.
pub struct RouteStore {
    lists: [RouteList; 6],
    /// `true` = blacklist enforced, `false` = whitelist enforced.
    enforcement: watch::Sender<bool>,
    routes_disabled: watch::Sender<bool>,
}

impl RouteStore {
    pub(crate) fn new(blacklist_enforced: bool, routes_disabled: bool) -> Self {
        let (enforcement, _) = watch::channel(blacklist_enforced);
        let (routes_disabled, _) = watch::channel(routes_disabled);
        Self {
            lists: std::array::from_fn(|_| RouteList::new()),
            enforcement,
            routes_disabled,
        }
    }

    pub(super) fn list(&self, key: RouteKey) -> &RouteList {
        &self.lists[key.slot()]
    }

    // ── Route lists ──────────────────────────────────────────────────

    /// Current entries of one cell, in backend order.
    pub fn entries(&self, key: RouteKey) -> Arc<Vec<String>> {
        self.list(key).snapshot()
    }

    pub fn subscribe(&self, key: RouteKey) -> watch::Receiver<Arc<Vec<String>>> {
        self.list(key).subscribe()
    }

    pub fn stream(&self, key: RouteKey) -> RouteStream {
        RouteStream::new(key, self.subscribe(key))
    }

    /// Number of refreshes that changed this cell.
    pub fn version(&self, key: RouteKey) -> u64 {
        self.list(key).version()
    }

    /// Total entry count across one partition.
    pub fn partition_len(&self, partition: Partition) -> usize {
        RouteKey::all()
            .filter(|k| k.partition == partition)
            .map(|k| self.list(k).snapshot().len())
            .sum()
    }

    // ── Shared flags ─────────────────────────────────────────────────

    pub fn blacklist_enforced(&self) -> bool {
        *self.enforcement.borrow()
    }

    pub fn subscribe_enforcement(&self) -> watch::Receiver<bool> {
        self.enforcement.subscribe()
    }

    pub(crate) fn set_blacklist_enforced(&self, enforced: bool) {
        self.enforcement.send_replace(enforced);
    }

    pub fn routes_disabled(&self) -> bool {
        *self.routes_disabled.borrow()
    }

    pub fn subscribe_routes_disabled(&self) -> watch::Receiver<bool> {
        self.routes_disabled.subscribe()
    }

    pub(crate) fn set_routes_disabled(&self, disabled: bool) {
        self.routes_disabled.send_replace(disabled);
    }
}
