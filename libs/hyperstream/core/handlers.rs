//! Callback registry
//!
//! Every subscription is optional and defaults to a no-op. Handlers can be
//! registered, replaced, and unregistered at any time, including from
//! inside another handler.
//!
//! Handlers run after the supervisor lock is released, so they may call
//! back into the client. A panicking handler is contained and logged; it
//! never unwinds into the client.

use crate::core::event::{Event, Payload};
use crate::traits::StreamError;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

type OpenHandler = Arc<dyn Fn() + Send + Sync>;
type MessageHandler = Arc<dyn Fn(&Payload, &Event) + Send + Sync>;
type PingHandler = Arc<dyn Fn(&str) + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&StreamError) + Send + Sync>;
type AttemptHandler = Arc<dyn Fn(u32) + Send + Sync>;
type CloseHandler = Arc<dyn Fn() + Send + Sync>;

/// Identifies a callback slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Open,
    Message,
    Ping,
    Error,
    Reconnecting,
    Reconnected,
    Close,
}

/// Optional callbacks exposed to the presentation layer
#[derive(Default)]
pub struct EventHandlers {
    open: RwLock<Option<OpenHandler>>,
    message: RwLock<Option<MessageHandler>>,
    ping: RwLock<Option<PingHandler>>,
    error: RwLock<Option<ErrorHandler>>,
    reconnecting: RwLock<Option<AttemptHandler>>,
    reconnected: RwLock<Option<AttemptHandler>>,
    close: RwLock<Option<CloseHandler>>,
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connection reached the open state
    pub fn on_open(&self, handler: impl Fn() + Send + Sync + 'static) -> &Self {
        *self.open.write() = Some(Arc::new(handler));
        self
    }

    /// Application event with its decoded payload and the raw event
    pub fn on_message(&self, handler: impl Fn(&Payload, &Event) + Send + Sync + 'static) -> &Self {
        *self.message.write() = Some(Arc::new(handler));
        self
    }

    /// Liveness event with its raw data
    pub fn on_ping(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> &Self {
        *self.ping.write() = Some(Arc::new(handler));
        self
    }

    /// Transport or HTTP status failure, reported before recovery
    pub fn on_error(&self, handler: impl Fn(&StreamError) + Send + Sync + 'static) -> &Self {
        *self.error.write() = Some(Arc::new(handler));
        self
    }

    /// A reconnect was scheduled (attempt number)
    pub fn on_reconnecting(&self, handler: impl Fn(u32) + Send + Sync + 'static) -> &Self {
        *self.reconnecting.write() = Some(Arc::new(handler));
        self
    }

    /// A scheduled reconnect was dispatched (attempt number)
    pub fn on_reconnected(&self, handler: impl Fn(u32) + Send + Sync + 'static) -> &Self {
        *self.reconnected.write() = Some(Arc::new(handler));
        self
    }

    /// Client reached the closed state
    pub fn on_close(&self, handler: impl Fn() + Send + Sync + 'static) -> &Self {
        *self.close.write() = Some(Arc::new(handler));
        self
    }

    /// Remove the handler in `kind`'s slot
    pub fn unregister(&self, kind: HandlerKind) {
        match kind {
            HandlerKind::Open => *self.open.write() = None,
            HandlerKind::Message => *self.message.write() = None,
            HandlerKind::Ping => *self.ping.write() = None,
            HandlerKind::Error => *self.error.write() = None,
            HandlerKind::Reconnecting => *self.reconnecting.write() = None,
            HandlerKind::Reconnected => *self.reconnected.write() = None,
            HandlerKind::Close => *self.close.write() = None,
        }
    }

    pub fn is_registered(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::Open => self.open.read().is_some(),
            HandlerKind::Message => self.message.read().is_some(),
            HandlerKind::Ping => self.ping.read().is_some(),
            HandlerKind::Error => self.error.read().is_some(),
            HandlerKind::Reconnecting => self.reconnecting.read().is_some(),
            HandlerKind::Reconnected => self.reconnected.read().is_some(),
            HandlerKind::Close => self.close.read().is_some(),
        }
    }

    pub(crate) fn emit_open(&self) {
        let handler = self.open.read().clone();
        if let Some(handler) = handler {
            guarded(HandlerKind::Open, || handler());
        }
    }

    pub(crate) fn emit_message(&self, payload: &Payload, event: &Event) {
        let handler = self.message.read().clone();
        if let Some(handler) = handler {
            guarded(HandlerKind::Message, || handler(payload, event));
        }
    }

    pub(crate) fn emit_ping(&self, data: &str) {
        let handler = self.ping.read().clone();
        if let Some(handler) = handler {
            guarded(HandlerKind::Ping, || handler(data));
        }
    }

    pub(crate) fn emit_error(&self, err: &StreamError) {
        let handler = self.error.read().clone();
        if let Some(handler) = handler {
            guarded(HandlerKind::Error, || handler(err));
        }
    }

    pub(crate) fn emit_reconnecting(&self, attempt: u32) {
        let handler = self.reconnecting.read().clone();
        if let Some(handler) = handler {
            guarded(HandlerKind::Reconnecting, || handler(attempt));
        }
    }

    pub(crate) fn emit_reconnected(&self, attempt: u32) {
        let handler = self.reconnected.read().clone();
        if let Some(handler) = handler {
            guarded(HandlerKind::Reconnected, || handler(attempt));
        }
    }

    pub(crate) fn emit_close(&self) {
        let handler = self.close.read().clone();
        if let Some(handler) = handler {
            guarded(HandlerKind::Close, || handler());
        }
    }
}

impl std::fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHandlers")
            .field("open", &self.is_registered(HandlerKind::Open))
            .field("message", &self.is_registered(HandlerKind::Message))
            .field("ping", &self.is_registered(HandlerKind::Ping))
            .field("error", &self.is_registered(HandlerKind::Error))
            .field("reconnecting", &self.is_registered(HandlerKind::Reconnecting))
            .field("reconnected", &self.is_registered(HandlerKind::Reconnected))
            .field("close", &self.is_registered(HandlerKind::Close))
            .finish()
    }
}

fn guarded(kind: HandlerKind, call: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(call)).is_err() {
        error!("{:?} handler panicked, continuing", kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unregistered_slots_are_noops() {
        let handlers = EventHandlers::new();
        handlers.emit_open();
        handlers.emit_ping("{}");
        handlers.emit_close();
        assert!(!handlers.is_registered(HandlerKind::Open));
    }

    #[test]
    fn test_register_and_unregister() {
        let handlers = EventHandlers::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        handlers.on_reconnecting(move |attempt| {
            counter.fetch_add(attempt as usize, Ordering::SeqCst);
        });
        assert!(handlers.is_registered(HandlerKind::Reconnecting));

        handlers.emit_reconnecting(2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        handlers.unregister(HandlerKind::Reconnecting);
        handlers.emit_reconnecting(5);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_replacing_a_handler() {
        let handlers = EventHandlers::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&first);
        handlers.on_close(move || {
            f.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&second);
        handlers.on_close(move || {
            s.fetch_add(1, Ordering::SeqCst);
        });

        handlers.emit_close();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let handlers = EventHandlers::new();
        handlers.on_error(|_| panic!("presentation layer bug"));
        handlers.emit_error(&StreamError::Transport("reset".into()));
        // Still usable afterwards
        handlers.emit_error(&StreamError::Transport("reset".into()));
    }
}
