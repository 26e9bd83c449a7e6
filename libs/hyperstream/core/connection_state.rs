use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle state of an event-stream client
///
/// ```text
/// Idle ──connect──> Connecting ──open──> Open
///                      │                  │
///                      └──failure─────────┴──> Reconnecting ──timer──> Connecting
///                                         │
///                    disconnect / give up └──> Closed ──connect──> Connecting
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    /// Built, never connected
    Idle = 0,
    /// A transport attempt is in flight
    Connecting = 1,
    /// The stream delivered its first signal
    Open = 2,
    /// Waiting for the reconnect timer
    Reconnecting = 3,
    /// Manually disconnected or recovery gave up
    Closed = 4,
}

impl ConnectionState {
    #[inline]
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Idle,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Open,
            3 => ConnectionState::Reconnecting,
            _ => ConnectionState::Closed,
        }
    }

    /// Whether a public `connect()` is allowed from this state
    #[inline]
    pub fn accepts_connect(&self) -> bool {
        matches!(self, ConnectionState::Idle | ConnectionState::Closed)
    }

    /// Whether a live transport may still be delivering signals
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Lock-free published copy of the connection state
///
/// Written only while the supervisor lock is held; read from anywhere.
#[derive(Debug)]
pub struct AtomicConnectionState {
    state: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            state: AtomicU8::new(initial as u8),
        }
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.get() == ConnectionState::Open
    }
}

/// Lock-free counters for an event-stream client
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    events_received: AtomicU64,
    pings_received: AtomicU64,
    errors: AtomicU64,
    reconnect_count: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_events(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_pings(&self) {
        self.pings_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_errors(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_reconnects(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn pings_received(&self) -> u64 {
        self.pings_received.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reconnect_count(&self) -> u64 {
        self.reconnect_count.load(Ordering::Relaxed)
    }
}

/// Client metrics snapshot
///
/// `events_received` counts every dispatched event, pings included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub events_received: u64,
    pub pings_received: u64,
    pub errors: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

impl Metrics {
    pub(crate) fn snapshot(metrics: &AtomicMetrics, state: ConnectionState) -> Self {
        Self {
            events_received: metrics.events_received(),
            pings_received: metrics.pings_received(),
            errors: metrics.errors(),
            reconnect_count: metrics.reconnect_count(),
            connection_state: state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip_through_atomic() {
        let state = AtomicConnectionState::new(ConnectionState::Idle);
        for next in [
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Reconnecting,
            ConnectionState::Closed,
        ] {
            state.set(next);
            assert_eq!(state.get(), next);
        }
    }

    #[test]
    fn test_connect_allowed_only_when_inactive() {
        assert!(ConnectionState::Idle.accepts_connect());
        assert!(ConnectionState::Closed.accepts_connect());
        assert!(!ConnectionState::Connecting.accepts_connect());
        assert!(!ConnectionState::Open.accepts_connect());
        assert!(!ConnectionState::Reconnecting.accepts_connect());
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = AtomicMetrics::new();
        metrics.increment_events();
        metrics.increment_events();
        metrics.increment_pings();
        metrics.increment_reconnects();

        let snapshot = Metrics::snapshot(&metrics, ConnectionState::Open);
        assert_eq!(snapshot.events_received, 2);
        assert_eq!(snapshot.pings_received, 1);
        assert_eq!(snapshot.errors, 0);
        assert_eq!(snapshot.reconnect_count, 1);
        assert_eq!(snapshot.connection_state, ConnectionState::Open);
    }
}
