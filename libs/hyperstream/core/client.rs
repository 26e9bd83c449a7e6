//! Reconnecting event-stream client
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────────────────────┐
//!  connect() ────>│  Supervisor (one parking_lot::Mutex)     │<──── disconnect()
//!                 │  state · attempts · generation · manual  │
//!                 └──────┬─────────────┬──────────────┬──────┘
//!                        │ spawn       │ reset        │ spawn
//!                        ▼             ▼              ▼
//!                 Transport task   KeepAlive task   Reconnect timer
//!                        │             │              │
//!                        └─> TransportSink / expiry / fire ──> re-checked under the lock
//!                                                              │
//!                                      callbacks run after the lock is released,
//!                                      inside the dispatch gate
//! ```
//!
//! Every spawned task carries the generation it was spawned for. Any
//! teardown bumps the generation, so a signal from an old transport or an
//! old timer is recognised and dropped at its resumption point. The manual
//! disconnect flag is checked at the same points.
//!
//! The dispatch gate is a reentrant lock held from the liveness check to the
//! end of the callback. `disconnect()` takes it first, so once it returns no
//! callback from the retired connection can still be running. Lock order is
//! gate, then supervisor; the gate is never taken while the supervisor lock
//! is held.

use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState, Metrics};
use crate::core::dispatcher::{Dispatched, Dispatcher};
use crate::core::event::Event;
use crate::core::handlers::EventHandlers;
use crate::core::keepalive::KeepAliveMonitor;
use crate::traits::*;
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Transports available to the supervisor
pub(crate) struct Transports {
    pub(crate) native: Arc<dyn Transport>,
    pub(crate) authenticated: Option<Arc<dyn Transport>>,
}

/// Callback owed to the presentation layer, emitted after unlocking
#[derive(Debug)]
enum Notice {
    Open,
    Reconnecting(u32),
    Reconnected(u32),
    Close,
}

/// Mutable supervisor state, guarded by a single mutex
#[derive(Debug)]
struct Supervisor {
    state: ConnectionState,
    attempts: u32,
    generation: u64,
    manual: bool,
    transport: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
    keepalive: KeepAliveMonitor,
    attempt_started_at: Option<Instant>,
    opened_at: Option<Instant>,
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.transport.take() {
            handle.abort();
        }
        if let Some(handle) = self.reconnect_timer.take() {
            handle.abort();
        }
    }
}

struct Shared {
    config: ClientConfig,
    transports: Transports,
    runtime: Handle,
    handlers: Arc<EventHandlers>,
    dispatcher: Dispatcher,
    state: AtomicConnectionState,
    metrics: AtomicMetrics,
    dispatch: ReentrantMutex<()>,
    supervisor: Mutex<Supervisor>,
}

impl Shared {
    fn transition(&self, sup: &mut Supervisor, next: ConnectionState) {
        if sup.state != next {
            debug!("Connection state {} -> {}", sup.state, next);
        }
        sup.state = next;
        self.state.set(next);
    }

    fn select_transport(&self) -> Arc<dyn Transport> {
        match (&self.config.credential, &self.transports.authenticated) {
            (Some(_), Some(transport)) => Arc::clone(transport),
            _ => Arc::clone(&self.transports.native),
        }
    }

    /// Cancel the live transport and keepalive, invalidating their signals
    fn retire_transport(&self, sup: &mut Supervisor) {
        if let Some(handle) = sup.transport.take() {
            handle.abort();
        }
        sup.keepalive.stop();
        sup.generation = sup.generation.wrapping_add(1);
        sup.opened_at = None;
    }

    fn start_attempt(self: &Arc<Self>, sup: &mut Supervisor) {
        self.retire_transport(sup);
        sup.manual = false;
        sup.attempt_started_at = Some(Instant::now());
        self.transition(sup, ConnectionState::Connecting);

        let transport = self.select_transport();
        let sink = TransportSink {
            shared: Arc::downgrade(self),
            generation: sup.generation,
        };
        let url = self.config.url.clone();

        debug!(
            "Starting {} transport (generation {})",
            transport.kind(),
            sup.generation
        );
        sup.transport = Some(self.runtime.spawn(async move {
            transport.run(url, sink).await;
        }));
    }

    fn open_locked(self: &Arc<Self>, sup: &mut Supervisor) -> Notice {
        self.transition(sup, ConnectionState::Open);
        sup.attempts = 0;
        sup.opened_at = Some(Instant::now());

        let elapsed = sup
            .attempt_started_at
            .map(|started| started.elapsed())
            .unwrap_or_default();
        info!("Connected to {} in {:?}", self.config.url, elapsed);

        self.arm_keepalive(sup);
        Notice::Open
    }

    fn arm_keepalive(self: &Arc<Self>, sup: &mut Supervisor) {
        let weak = Arc::downgrade(self);
        let generation = sup.generation;
        sup.keepalive.reset(&self.runtime, move |token| {
            if let Some(shared) = weak.upgrade() {
                shared.on_keepalive_expired(generation, token);
            }
        });
    }

    /// The single recovery pathway for every failure
    fn handle_disconnect(self: &Arc<Self>, sup: &mut Supervisor) -> Option<Notice> {
        if sup.manual {
            debug!("Disconnect signal after manual disconnect, ignoring");
            return None;
        }
        if !sup.state.is_active() {
            return None;
        }

        self.retire_transport(sup);

        if !self.config.auto_reconnect {
            info!("Connection lost, auto-reconnect disabled");
            self.transition(sup, ConnectionState::Closed);
            return Some(Notice::Close);
        }

        if let Some(max) = self.config.max_reconnect_attempts {
            if sup.attempts >= max {
                warn!("Max reconnect attempts ({}) reached, giving up", max);
                self.transition(sup, ConnectionState::Closed);
                return Some(Notice::Close);
            }
        }

        sup.attempts += 1;
        let attempt = sup.attempts;
        self.transition(sup, ConnectionState::Reconnecting);

        let interval = self.config.reconnect_interval;
        let generation = sup.generation;
        let weak = Arc::downgrade(self);
        sup.reconnect_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(shared) = weak.upgrade() {
                shared.fire_reconnect(generation);
            }
        }));

        info!("Reconnecting in {:?} (attempt {})", interval, attempt);
        Some(Notice::Reconnecting(attempt))
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let _gate = self.dispatch.lock();
        let attempt = {
            let mut sup = self.supervisor.lock();
            if sup.manual
                || sup.state != ConnectionState::Reconnecting
                || sup.generation != generation
            {
                debug!("Stale reconnect timer, ignoring");
                return;
            }

            // Running inside the timer task; forget the handle instead of aborting it
            sup.reconnect_timer = None;
            let attempt = sup.attempts;
            info!("Reconnect attempt {} to {}", attempt, self.config.url);
            self.start_attempt(&mut sup);
            attempt
        };

        self.metrics.increment_reconnects();
        self.announce(Some(Notice::Reconnected(attempt)));
    }

    fn on_keepalive_expired(self: &Arc<Self>, generation: u64, token: u64) {
        let _gate = self.dispatch.lock();
        let notice = {
            let mut sup = self.supervisor.lock();
            if !sup.keepalive.is_current(token)
                || sup.generation != generation
                || sup.manual
                || sup.state != ConnectionState::Open
            {
                debug!("Stale keepalive expiry, ignoring");
                return;
            }

            sup.keepalive.disarm();
            let timeout = StreamError::Timeout(format!(
                "no events for {:?}",
                sup.keepalive.window()
            ));
            warn!("{}, forcing reconnect", timeout);
            self.handle_disconnect(&mut sup)
        };

        self.announce(notice);
    }

    fn announce(&self, notices: impl IntoIterator<Item = Notice>) {
        for notice in notices {
            match notice {
                Notice::Open => self.handlers.emit_open(),
                Notice::Reconnecting(attempt) => self.handlers.emit_reconnecting(attempt),
                Notice::Reconnected(attempt) => self.handlers.emit_reconnected(attempt),
                Notice::Close => self.handlers.emit_close(),
            }
        }
    }
}

/// Handle a transport uses to report one connection attempt
///
/// Every method re-checks, under the supervisor lock, that the attempt is
/// still current and that no manual disconnect happened. Signals from a
/// stale attempt are dropped. The check and the callbacks it leads to run
/// inside the dispatch gate, so they cannot interleave with `disconnect()`.
#[derive(Debug, Clone)]
pub struct TransportSink {
    shared: Weak<Shared>,
    generation: u64,
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("config", &self.config)
            .field("state", &self.state.get())
            .finish()
    }
}

impl TransportSink {
    fn live(&self, sup: &Supervisor) -> bool {
        sup.generation == self.generation && !sup.manual
    }

    /// Whether signals from this attempt are still accepted
    pub fn is_live(&self) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let sup = shared.supervisor.lock();
        self.live(&sup)
    }

    /// The stream is established
    pub fn opened(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let _gate = shared.dispatch.lock();
        let notice = {
            let mut sup = shared.supervisor.lock();
            if !self.live(&sup) || sup.state != ConnectionState::Connecting {
                return;
            }
            shared.open_locked(&mut sup)
        };

        shared.announce(Some(notice));
    }

    /// One complete event arrived
    ///
    /// An event on a connecting attempt counts as its first successful
    /// signal and opens the connection first.
    pub fn event(&self, event: Event) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let _gate = shared.dispatch.lock();
        let opened = {
            let mut sup = shared.supervisor.lock();
            if !self.live(&sup) {
                debug!("Discarding '{}' event from stale connection", event.event_type);
                return;
            }

            match sup.state {
                ConnectionState::Connecting => Some(shared.open_locked(&mut sup)),
                ConnectionState::Open => {
                    shared.arm_keepalive(&mut sup);
                    None
                }
                _ => return,
            }
        };

        if opened.is_some() {
            shared.announce(opened);
            // on_open may have disconnected
            if !self.live(&shared.supervisor.lock()) {
                return;
            }
        }

        shared.metrics.increment_events();
        if shared.dispatcher.dispatch(&event) == Dispatched::Ping {
            shared.metrics.increment_pings();
        }
    }

    /// Report a failure via `on_error`
    ///
    /// Does not end the attempt; follow with [`TransportSink::closed`].
    pub fn error(&self, err: StreamError) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let _gate = shared.dispatch.lock();
        if !self.live(&shared.supervisor.lock()) {
            debug!("Discarding error from stale connection: {}", err);
            return;
        }

        warn!("Stream error: {}", err);
        shared.metrics.increment_errors();
        shared.handlers.emit_error(&err);
    }

    /// The stream ended or failed; hand off to recovery
    pub fn closed(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let _gate = shared.dispatch.lock();
        let notice = {
            let mut sup = shared.supervisor.lock();
            if !self.live(&sup) {
                return;
            }
            // Called from the transport task itself; detach rather than abort
            sup.transport = None;
            shared.handle_disconnect(&mut sup)
        };

        shared.announce(notice);
    }
}

/// Resilient server-sent event stream client
///
/// Cheap to clone; clones share one connection. Dropping the last clone
/// cancels the transport and all timers. Handlers are owned by the client,
/// so a handler that needs the client should capture a
/// [`WeakEventStreamClient`] from [`EventStreamClient::downgrade`]. A strong
/// clone captured by a handler keeps the client alive until the process
/// exits.
///
/// # Example
/// ```ignore
/// let client = EventStreamClient::builder()
///     .url("https://notify.example.com/api/v1/subscribe")
///     .credential(token)
///     .max_reconnect_attempts(10)
///     .build()?;
///
/// client.handlers().on_message(|payload, event| {
///     println!("{}: {:?}", event.event_type, payload);
/// });
///
/// client.connect()?;
/// ```
#[derive(Debug, Clone)]
pub struct EventStreamClient {
    shared: Arc<Shared>,
}

impl EventStreamClient {
    /// Create a new client builder
    pub fn builder() -> crate::builder::EventStreamClientBuilder<crate::builder::states::NoUrl> {
        crate::builder::EventStreamClientBuilder::new()
    }

    pub(crate) fn new(config: ClientConfig, transports: Transports, runtime: Handle) -> Self {
        let handlers = Arc::new(EventHandlers::new());
        let keepalive = KeepAliveMonitor::new(config.ping_timeout);

        Self {
            shared: Arc::new(Shared {
                dispatcher: Dispatcher::new(Arc::clone(&handlers)),
                handlers,
                transports,
                runtime,
                state: AtomicConnectionState::new(ConnectionState::Idle),
                metrics: AtomicMetrics::new(),
                dispatch: ReentrantMutex::new(()),
                supervisor: Mutex::new(Supervisor {
                    state: ConnectionState::Idle,
                    attempts: 0,
                    generation: 0,
                    manual: false,
                    transport: None,
                    reconnect_timer: None,
                    keepalive,
                    attempt_started_at: None,
                    opened_at: None,
                }),
                config,
            }),
        }
    }

    /// Start connecting
    ///
    /// Only valid from `Idle` or `Closed`; any other state returns
    /// [`StreamError::InvalidState`]. An explicit connect starts a fresh
    /// reconnect budget.
    pub fn connect(&self) -> Result<()> {
        let mut sup = self.shared.supervisor.lock();
        if !sup.state.accepts_connect() {
            return Err(StreamError::InvalidState(format!(
                "connect() called while {}",
                sup.state
            )));
        }

        info!(
            "Connecting to {} ({} transport)",
            self.shared.config.url,
            self.shared.select_transport().kind()
        );
        sup.attempts = 0;
        self.shared.start_attempt(&mut sup);
        Ok(())
    }

    /// Close the connection and suppress any further automatic recovery
    ///
    /// Valid from any state. Always ends in `Closed` and fires `on_close`.
    /// Waits for a callback running on another thread to finish; from inside
    /// a callback it takes effect immediately.
    pub fn disconnect(&self) {
        let _gate = self.shared.dispatch.lock();
        {
            let mut sup = self.shared.supervisor.lock();
            sup.manual = true;
            if let Some(timer) = sup.reconnect_timer.take() {
                timer.abort();
            }
            self.shared.retire_transport(&mut sup);
            sup.attempt_started_at = None;
            self.shared.transition(&mut sup, ConnectionState::Closed);
        }

        info!("Disconnected from {}", self.shared.config.url);
        self.shared.announce(Some(Notice::Close));
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.shared.state.is_open()
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Whole seconds since the connection opened, or 0 when not open
    pub fn connection_duration(&self) -> u64 {
        let sup = self.shared.supervisor.lock();
        match (sup.state, sup.opened_at) {
            (ConnectionState::Open, Some(opened_at)) => opened_at.elapsed().as_secs(),
            _ => 0,
        }
    }

    /// Consecutive automatic attempts since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.supervisor.lock().attempts
    }

    /// Callback registry
    pub fn handlers(&self) -> &EventHandlers {
        &self.shared.handlers
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::snapshot(&self.shared.metrics, self.shared.state.get())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    /// Non-owning handle for use inside handlers
    pub fn downgrade(&self) -> WeakEventStreamClient {
        WeakEventStreamClient {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

/// Non-owning handle to an [`EventStreamClient`]
#[derive(Debug, Clone)]
pub struct WeakEventStreamClient {
    shared: Weak<Shared>,
}

impl WeakEventStreamClient {
    /// The client, unless every strong handle has been dropped
    pub fn upgrade(&self) -> Option<EventStreamClient> {
        self.shared
            .upgrade()
            .map(|shared| EventStreamClient { shared })
    }
}
