//! Keepalive monitor for event-stream connections
//!
//! # Architecture
//!
//! The monitor is a single-shot, resettable silence detector backed by a
//! dedicated Tokio task:
//!
//! ```text
//! ┌──────────────────────┐
//! │  Keepalive Task      │
//! │  (Tokio spawn)       │
//! │                      │
//! │  1. Sleep(window)    │
//! │  2. on_expire(token) ┼──> Supervisor (checks token under its lock)
//! └──────────────────────┘
//!        ▲
//!        │ reset(): abort previous task, spawn a fresh one
//!        │ stop():  abort unconditionally
//! ```
//!
//! Any event, including `ping`, resets the window. The monitor does not
//! look at event types.
//!
//! Every arming gets a new token. An expiry callback that lost a race with
//! `reset()` or `stop()` carries a stale token, which the owner rejects
//! with [`KeepAliveMonitor::is_current`].

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Single-shot resettable keepalive timer
#[derive(Debug)]
pub struct KeepAliveMonitor {
    window: Duration,
    armed: Option<JoinHandle<()>>,
    arming: u64,
}

impl KeepAliveMonitor {
    /// Create a disarmed monitor for the given silence window
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
            arming: 0,
        }
    }

    /// Cancel any pending timeout and start a fresh window
    ///
    /// `on_expire` runs at most once, with the token of this arming, if the
    /// window elapses before the next `reset()`/`stop()`.
    pub fn reset<F>(&mut self, runtime: &Handle, on_expire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.stop();
        self.arming = self.arming.wrapping_add(1);

        let token = self.arming;
        let window = self.window;
        self.armed = Some(runtime.spawn(async move {
            tokio::time::sleep(window).await;
            debug!("Keepalive window of {:?} elapsed", window);
            on_expire(token);
        }));
    }

    /// Cancel the pending timeout, if any
    pub fn stop(&mut self) {
        if let Some(handle) = self.armed.take() {
            handle.abort();
        }
    }

    /// Forget the pending timeout without cancelling it
    ///
    /// Used from inside the expiry callback itself.
    pub(crate) fn disarm(&mut self) {
        self.armed = None;
    }

    /// Whether `token` belongs to the live arming
    #[inline]
    pub fn is_current(&self, token: u64) -> bool {
        self.armed.is_some() && token == self.arming
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Drop for KeepAliveMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting() -> (Arc<AtomicUsize>, impl FnOnce(u64) + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        (fired, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_window() {
        let mut monitor = KeepAliveMonitor::new(Duration::from_millis(100));
        let (fired, on_expire) = counting();
        monitor.reset(&Handle::current(), on_expire);
        assert!(monitor.is_armed());

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_postpones_expiry() {
        let mut monitor = KeepAliveMonitor::new(Duration::from_millis(100));
        let (first, on_first) = counting();
        monitor.reset(&Handle::current(), on_first);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let (second, on_second) = counting();
        monitor.reset(&Handle::current(), on_second);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels() {
        let mut monitor = KeepAliveMonitor::new(Duration::from_millis(50));
        let (fired, on_expire) = counting();
        monitor.reset(&Handle::current(), on_expire);
        monitor.stop();
        assert!(!monitor.is_armed());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_identify_arming() {
        let mut monitor = KeepAliveMonitor::new(Duration::from_millis(50));
        let seen = Arc::new(AtomicU64::new(0));

        monitor.reset(&Handle::current(), |_| {});
        let seen_clone = Arc::clone(&seen);
        monitor.reset(&Handle::current(), move |token| {
            seen_clone.store(token, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(60)).await;
        let token = seen.load(Ordering::SeqCst);
        assert!(monitor.is_current(token));
        assert!(!monitor.is_current(token - 1));

        monitor.stop();
        assert!(!monitor.is_current(token));
    }
}
