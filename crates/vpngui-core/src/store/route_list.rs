// ── Single route list cell ──
//
// One (partition, category) list. Replaced wholesale on every refresh,
// never patched in place.

use std::sync::Arc;

use tokio::sync::watch;

pub(crate) struct RouteList {
    snapshot: watch::Sender<Arc<Vec<String>>>,
    version: watch::Sender<u64>,
}

impl RouteList {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        let (version, _) = watch::channel(0u64);
        Self { snapshot, version }
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<String>> {
        self.snapshot.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<String>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Replace the list. Subscribers are woken only if the entries differ.
    /// Returns whether anything changed.
    pub(crate) fn replace(&self, entries: Vec<String>) -> bool {
        let changed = self.snapshot.send_if_modified(|snap| {
            if **snap == entries {
                false
            } else {
                *snap = Arc::new(entries);
                true
            }
        });
        if changed {
            self.version.send_modify(|v| *v = v.wrapping_add(1));
        }
        changed
    }
}
