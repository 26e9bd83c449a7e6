pub mod states;

use crate::client::{EventStreamClient, Transports};
use crate::config::{ClientConfig, StreamSettings};
use crate::core::transport::{AuthenticatedTransport, HttpEventSource, NativeTransport};
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Connect timeout applied to the default HTTP client
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Type-state builder for EventStreamClient
///
/// This builder uses Rust's type system to enforce that the target address
/// is set before the client can be built. Everything else is optional and
/// defaults to the documented connection policy.
pub struct EventStreamClientBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    credential: Option<String>,
    auto_reconnect: bool,
    reconnect_interval: Duration,
    max_reconnect_attempts: Option<u32>,
    ping_timeout: Duration,
    http_client: Option<reqwest::Client>,
    native_connector: Option<Arc<dyn NativeConnector>>,
    native_transport: Option<Arc<dyn Transport>>,
    authenticated_transport: Option<Arc<dyn Transport>>,
}

impl EventStreamClientBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            credential: None,
            auto_reconnect: true,
            reconnect_interval: crate::config::DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: None,
            ping_timeout: crate::config::DEFAULT_PING_TIMEOUT,
            http_client: None,
            native_connector: None,
            native_transport: None,
            authenticated_transport: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> EventStreamClientBuilder<HasUrl> {
        EventStreamClientBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            credential: self.credential,
            auto_reconnect: self.auto_reconnect,
            reconnect_interval: self.reconnect_interval,
            max_reconnect_attempts: self.max_reconnect_attempts,
            ping_timeout: self.ping_timeout,
            http_client: self.http_client,
            native_connector: self.native_connector,
            native_transport: self.native_transport,
            authenticated_transport: self.authenticated_transport,
        }
    }

    /// Apply file-backed settings, including the target address
    pub fn settings(self, settings: StreamSettings) -> EventStreamClientBuilder<HasUrl> {
        let mut builder = self
            .url(settings.url.clone())
            .auto_reconnect(settings.auto_reconnect)
            .reconnect_interval(settings.reconnect_interval())
            .ping_timeout(settings.ping_timeout());

        builder.max_reconnect_attempts = settings.max_reconnect_attempts;
        builder.credential = settings.credential;
        builder
    }
}

impl Default for EventStreamClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> EventStreamClientBuilder<U>
where
    U: UrlState,
{
    /// Bearer credential; forces the authenticated transport path
    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Enable or disable automatic recovery (default enabled)
    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Fixed delay before each reconnect attempt (default 3000 ms)
    ///
    /// The delay is constant across attempts; there is no backoff growth.
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Ceiling on consecutive automatic attempts (default unbounded)
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Silence window before forcing a reconnect (default 30000 ms)
    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = timeout;
        self
    }

    /// HTTP client shared by the built-in transports
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Host primitive used by the native transport
    pub fn native_connector(mut self, connector: impl NativeConnector + 'static) -> Self {
        self.native_connector = Some(Arc::new(connector));
        self
    }

    /// Replace the whole no-credential transport
    pub fn native_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.native_transport = Some(transport);
        self
    }

    /// Replace the whole credential-carrying transport
    ///
    /// Only selected when a credential is configured.
    pub fn authenticated_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.authenticated_transport = Some(transport);
        self
    }
}

// Build method - only available when the URL is set
impl EventStreamClientBuilder<HasUrl> {
    /// Validate the configuration and create an idle client
    ///
    /// Must be called from within a Tokio runtime; the client spawns its
    /// transports and timers on it.
    pub fn build(self) -> Result<EventStreamClient> {
        let url = self.url.unwrap_or_default();

        let mut config = ClientConfig::new(&url)?;
        config.credential = self.credential;
        config.auto_reconnect = self.auto_reconnect;
        config.reconnect_interval = self.reconnect_interval;
        config.max_reconnect_attempts = self.max_reconnect_attempts;
        config.ping_timeout = self.ping_timeout;
        config.validate()?;

        let runtime = Handle::try_current().map_err(|e| {
            StreamError::Configuration(format!("No Tokio runtime available: {}", e))
        })?;

        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
                .build()
                .map_err(|e| {
                    StreamError::Configuration(format!("Failed to build HTTP client: {}", e))
                })?,
        };

        let native: Arc<dyn Transport> = match self.native_transport {
            Some(transport) => transport,
            None => {
                let connector = self
                    .native_connector
                    .unwrap_or_else(|| Arc::new(HttpEventSource::new(http.clone())));
                Arc::new(NativeTransport::new(connector))
            }
        };

        let authenticated: Option<Arc<dyn Transport>> = match self.authenticated_transport {
            Some(transport) => Some(transport),
            None => config.credential.clone().map(|credential| {
                Arc::new(AuthenticatedTransport::new(http, credential)) as Arc<dyn Transport>
            }),
        };

        Ok(EventStreamClient::new(
            config,
            Transports {
                native,
                authenticated,
            },
            runtime,
        ))
    }
}
