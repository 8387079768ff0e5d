// ── Reactive route streams ──
//
// Subscription handle for one route list cell.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::RouteKey;

/// A subscription to one (partition, category) route list.
///
/// Provides both point-in-time snapshot access and change notification
/// via [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct RouteStream {
    key: RouteKey,
    current: Arc<Vec<String>>,
    receiver: watch::Receiver<Arc<Vec<String>>>,
}

impl RouteStream {
    pub(crate) fn new(key: RouteKey, receiver: watch::Receiver<Arc<Vec<String>>>) -> Self {
        let current = receiver.borrow().clone();
        Self {
            key,
            current,
            receiver,
        }
    }

    pub fn key(&self) -> RouteKey {
        self.key
    }

    /// Snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<Vec<String>> {
        &self.current
    }

    /// Latest snapshot, which may be newer than `current()`.
    pub fn latest(&self) -> Arc<Vec<String>> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next refresh that changed this list.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Vec<String>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    pub fn into_stream(self) -> RouteWatchStream {
        RouteWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each new snapshot of a route list, starting
/// with the current one.
pub struct RouteWatchStream {
    inner: WatchStream<Arc<Vec<String>>>,
}

impl Stream for RouteWatchStream {
    type Item = Arc<Vec<String>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
