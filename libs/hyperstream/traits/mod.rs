//! # HyperStream Traits
//!
//! Core traits and types shared by the event-stream client:
//!
//! - **Transport**: one connection attempt, native or authenticated
//! - **NativeConnector**: host-provided primitive for the no-credential path
//! - **StreamError**: error taxonomy for the whole crate

pub mod error;
pub mod native;
pub mod transport;

// Re-export commonly used types
pub use error::{Result, StreamError};
pub use native::{NativeConnector, NativeSignal};
pub use transport::{Transport, TransportKind};
