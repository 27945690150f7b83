// ── Reactive snapshot streams ──
//
// Subscription handles vended by the store and the alert aggregator.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::TelemetrySnapshot;

/// A subscription to a `watch`-published value.
///
/// Provides point-in-time access and change notification through
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct WatchSubscription<T: Clone + Send + Sync + 'static> {
    current: T,
    receiver: watch::Receiver<T>,
}

/// Subscription to the telemetry store.
pub type SnapshotStream = WatchSubscription<Arc<TelemetrySnapshot>>;

impl<T: Clone + Send + Sync + 'static> WatchSubscription<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<T>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// The value captured at creation time or by the last `changed()`.
    pub fn current(&self) -> &T {
        &self.current
    }

    /// The latest published value.
    pub fn latest(&self) -> T {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new value.
    /// Returns `None` once the publisher has been dropped.
    pub async fn changed(&mut self) -> Option<T> {
        self.receiver.changed().await.ok()?;
        let value = self.receiver.borrow_and_update().clone();
        self.current = value.clone();
        Some(value)
    }

    /// Convert into a `Stream` that yields the current value, then every change.
    pub fn into_stream(self) -> SubscriptionStream<T> {
        SubscriptionStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
pub struct SubscriptionStream<T: Clone + Send + Sync + 'static> {
    inner: WatchStream<T>,
}

impl<T: Clone + Send + Sync + 'static> Stream for SubscriptionStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
