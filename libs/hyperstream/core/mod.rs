//! # HyperStream core
//!
//! Connection lifecycle and framing engine for server-sent event streams.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hyperstream::{EventStreamClient, Payload};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> hyperstream::Result<()> {
//!     let client = EventStreamClient::builder()
//!         .url("https://notify.example.com/api/v1/subscribe")
//!         .credential(std::env::var("NOTIFICATION_BEARER_TOKEN").unwrap_or_default())
//!         .reconnect_interval(Duration::from_secs(3))
//!         .max_reconnect_attempts(10)
//!         .build()?;
//!
//!     client
//!         .handlers()
//!         .on_message(|payload, event| match payload {
//!             Payload::Structured(value) => println!("{}: {}", event.event_type, value),
//!             Payload::Raw(text) => println!("{}: {}", event.event_type, text),
//!         })
//!         .on_reconnecting(|attempt| println!("reconnecting ({})", attempt));
//!
//!     client.connect()?;
//!     tokio::signal::ctrl_c().await.ok();
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod dispatcher;
pub mod event;
pub mod handlers;
pub mod keepalive;
pub mod parser;
pub mod transport;

// Re-export main types
pub use builder::{states, EventStreamClientBuilder};
pub use client::{EventStreamClient, TransportSink, WeakEventStreamClient};
pub use config::{ClientConfig, StreamSettings};
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
pub use dispatcher::{Dispatched, Dispatcher};
pub use event::{Event, Payload};
pub use handlers::{EventHandlers, HandlerKind};
pub use keepalive::KeepAliveMonitor;
pub use parser::FrameParser;
pub use transport::{AuthenticatedTransport, HttpEventSource, NativeTransport};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new event-stream client builder
///
/// Convenience for [`EventStreamClient::builder`].
pub fn builder() -> EventStreamClientBuilder<states::NoUrl> {
    EventStreamClientBuilder::new()
}
