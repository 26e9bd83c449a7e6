//! # HyperStream
//!
//! A resilient client for long-lived server-sent event streams.
//!
//! ## Features
//!
//! - **Dual transport**: header-less native primitive, or a manual HTTP
//!   reader when a bearer credential must be attached
//! - **Incremental framing**: chunk-boundary independent parser with UTF-8
//!   carry-over
//! - **Keepalive**: silence detection that forces a reconnect
//! - **Supervised recovery**: fixed-delay reconnects with an optional
//!   attempt ceiling, single-flight timers, and manual disconnect that
//!   always wins
//! - **Type-state builder**: a client cannot be built without a target

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, dispatcher, event, handlers, keepalive, parser,
    transport,
    builder::{states, EventStreamClientBuilder},
    client::{EventStreamClient, TransportSink, WeakEventStreamClient},
    config::{ClientConfig, StreamSettings},
    connection_state::{ConnectionState, Metrics},
    event::{Event, Payload},
    handlers::{EventHandlers, HandlerKind},
    parser::FrameParser,
    transport::{AuthenticatedTransport, HttpEventSource, NativeTransport},
};

// Convenience function
pub use self::core::builder as client_builder;
