use crate::core::event::{Event, Payload};
use crate::core::handlers::EventHandlers;
use std::sync::Arc;
use tracing::debug;

/// Outcome of dispatching one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Ping,
    Message { structured: bool },
}

/// Classifies parsed events and invokes the matching callback
///
/// `ping` events go to `on_ping` with their raw data. Every other type,
/// the default `message` channel included, goes to `on_message` with a
/// decoded payload. Decoding falls back to the raw string and never fails.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handlers: Arc<EventHandlers>,
}

impl Dispatcher {
    pub fn new(handlers: Arc<EventHandlers>) -> Self {
        Self { handlers }
    }

    pub fn dispatch(&self, event: &Event) -> Dispatched {
        if event.is_ping() {
            debug!("Ping received");
            self.handlers.emit_ping(&event.data);
            return Dispatched::Ping;
        }

        let payload = Payload::decode(&event.data);
        let structured = payload.is_structured();
        debug!(
            "Event '{}' received ({} payload)",
            event.event_type,
            if structured { "structured" } else { "raw" }
        );
        self.handlers.emit_message(&payload, event);
        Dispatched::Message { structured }
    }
}
