//! Delayed adapter - wraps another adapter with backend latency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use brain_core::{Adapter, AdapterReply, BrainError, Turn};
use tokio::sync::Notify;
use tokio::time::sleep;

/// An adapter that answers through `inner` after a fixed latency.
///
/// It counts calls in flight and remembers the peak, so tests can tell
/// whether turns overlapped without measuring wall time.
/// [`wait_for_call`](Self::wait_for_call) resolves once a call has started.
pub struct DelayedAdapter<A: Adapter> {
    inner: A,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    started: Notify,
}

impl<A: Adapter> DelayedAdapter<A> {
    /// Wrap `inner` with the given latency.
    pub fn new(inner: A, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            started: Notify::new(),
        }
    }

    /// Wrap `inner` with a latency in milliseconds.
    pub fn with_millis(inner: A, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// Calls currently waiting out the latency or running on `inner`.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Most calls that were ever in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Wait until a call has started. A call that started before anyone
    /// waited is remembered once.
    pub async fn wait_for_call(&self) {
        self.started.notified().await;
    }
}

/// Decrements the in-flight count when a call ends or is dropped.
struct Tracked<'a>(&'a AtomicUsize);

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl<A: Adapter> Adapter for DelayedAdapter<A> {
    async fn call(&self, system_prompt: &str, turns: &[Turn]) -> Result<AdapterReply, BrainError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _tracked = Tracked(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.started.notify_one();

        sleep(self.delay).await;
        self.inner.call(system_prompt, turns).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EchoAdapter, ScriptedAdapter};
    use std::time::Instant;

    #[tokio::test]
    async fn test_delayed_adapter() {
        let adapter = DelayedAdapter::with_millis(EchoAdapter::raw(), 100);

        let start = Instant::now();
        let reply = adapter.call("", &[Turn::user("test")]).await.unwrap();

        assert_eq!(reply.content_text(), "test");
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(adapter.in_flight(), 0);
        assert_eq!(adapter.peak_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_tracks_overlapping_calls() {
        let adapter = DelayedAdapter::with_millis(EchoAdapter::raw(), 50);
        let turns = [Turn::user("x")];

        let watcher = async {
            adapter.wait_for_call().await;
            adapter.in_flight()
        };
        let (a, b, seen) = tokio::join!(adapter.call("", &turns), adapter.call("", &turns), watcher);

        assert!(a.is_ok() && b.is_ok());
        assert!(seen >= 1);
        assert_eq!(adapter.peak_in_flight(), 2);
        assert_eq!(adapter.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_reports_inner_name() {
        let adapter = DelayedAdapter::with_millis(ScriptedAdapter::with_replies("slow-model", ["{}"]), 0);
        assert_eq!(adapter.name(), "slow-model");
    }
}
