//! Concrete transports
//!
//! - [`AuthenticatedTransport`]: manual HTTP reader carrying a bearer
//!   credential, frames parsed by [`FrameParser`](crate::core::parser::FrameParser)
//! - [`NativeTransport`]: adapter over a host-provided [`NativeConnector`](crate::traits::NativeConnector)
//! - [`HttpEventSource`]: default header-less native primitive over `reqwest_eventsource`

pub mod authenticated;
pub mod native;

pub use authenticated::AuthenticatedTransport;
pub use native::{HttpEventSource, NativeTransport};

/// Media type requested from the server
pub const EVENT_STREAM_MIME: &str = "text/event-stream";
