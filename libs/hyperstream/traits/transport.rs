//! Transport capability
//!
//! A transport owns the bytes for exactly one connection attempt. The
//! supervisor selects one per `connect()` call and never switches it
//! mid-connection.
//!
//! ```text
//! connect() ──> Transport::run(url, sink)
//!                    │
//!                    ├─> sink.opened()        first successful signal
//!                    ├─> sink.event(event)    one per completed frame
//!                    ├─> sink.error(err)      reported via on_error
//!                    └─> sink.closed()        end of stream / failure
//! ```
//!
//! Closing is owned by the supervisor: it cancels the task driving `run`,
//! which drops whatever stream the transport was reading.

use crate::core::client::TransportSink;
use async_trait::async_trait;
use reqwest::Url;
use std::fmt;

/// Which transport path carried the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Host-provided primitive, no custom headers
    Native,
    /// Manual HTTP reader carrying a bearer credential
    Authenticated,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Native => f.write_str("native"),
            TransportKind::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// Polymorphic transport driven by the reconnection supervisor
///
/// Implementations report everything through the [`TransportSink`]. The
/// sink discards signals once the attempt is stale (manual disconnect or a
/// newer attempt), so implementations may check [`TransportSink::is_live`]
/// to stop early but are not required to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport path, used for logging and selection
    fn kind(&self) -> TransportKind;

    /// Open the connection and drive it until it ends
    ///
    /// Must call `sink.closed()` (directly or after `sink.error`) when the
    /// stream ends or fails, unless the sink is no longer live.
    async fn run(&self, url: Url, sink: TransportSink);
}
