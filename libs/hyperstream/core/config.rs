use crate::core::builder::states::HasUrl;
use crate::core::builder::EventStreamClientBuilder;
use crate::traits::{Result, StreamError};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default fixed delay before a reconnect attempt
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);

/// Default silence window before forcing a reconnect
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(30000);

/// Environment variable consulted for the bearer credential
pub const CREDENTIAL_ENV_VAR: &str = "NOTIFICATION_BEARER_TOKEN";

/// Validated, immutable configuration for an [`EventStreamClient`]
///
/// Built through the client builder; a config that exists has already
/// passed validation.
///
/// [`EventStreamClient`]: crate::core::client::EventStreamClient
#[derive(Clone)]
pub struct ClientConfig {
    /// Event stream address (http:// or https://)
    pub(crate) url: Url,

    /// Bearer credential; forces the authenticated transport when present
    pub(crate) credential: Option<String>,

    /// Recover automatically after a failure
    pub(crate) auto_reconnect: bool,

    /// Fixed delay before each reconnect attempt
    pub(crate) reconnect_interval: Duration,

    /// Ceiling on consecutive automatic attempts (None = unbounded)
    pub(crate) max_reconnect_attempts: Option<u32>,

    /// Silence window before the connection is declared stale
    pub(crate) ping_timeout: Duration,
}

impl ClientConfig {
    pub(crate) fn new(url: &str) -> Result<Self> {
        Ok(Self {
            url: parse_url(url)?,
            credential: None,
            auto_reconnect: true,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: None,
            ping_timeout: DEFAULT_PING_TIMEOUT,
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.ping_timeout.is_zero() {
            return Err(StreamError::Configuration(
                "Ping timeout must be > 0".to_string(),
            ));
        }
        if matches!(&self.credential, Some(c) if c.trim().is_empty()) {
            return Err(StreamError::Configuration(
                "Credential must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Get a reference to the URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Check if a bearer credential is configured
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn auto_reconnect(&self) -> bool {
        self.auto_reconnect
    }

    pub fn reconnect_interval(&self) -> Duration {
        self.reconnect_interval
    }

    pub fn max_reconnect_attempts(&self) -> Option<u32> {
        self.max_reconnect_attempts
    }

    pub fn ping_timeout(&self) -> Duration {
        self.ping_timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url.as_str())
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("auto_reconnect", &self.auto_reconnect)
            .field("reconnect_interval", &self.reconnect_interval)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("ping_timeout", &self.ping_timeout)
            .finish()
    }
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(StreamError::Configuration(
            "Target address is required".to_string(),
        ));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| StreamError::Configuration(format!("Invalid target address '{}': {}", trimmed, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(StreamError::Configuration(format!(
            "Unsupported scheme '{}', expected http or https",
            other
        ))),
    }
}

/// File-backed stream settings
///
/// Durations are in milliseconds. The credential is normally kept out of
/// the file and read from [`CREDENTIAL_ENV_VAR`].
///
/// ```yaml
/// url: "https://notify.example.com/api/v1/subscribe"
/// auto_reconnect: true
/// reconnect_interval_ms: 3000
/// max_reconnect_attempts: 10
/// ping_timeout_ms: 30000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamSettings {
    pub url: String,

    #[serde(default)]
    pub credential: Option<String>,

    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,

    #[serde(default = "default_ping_timeout_ms")]
    pub ping_timeout_ms: u64,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL.as_millis() as u64
}

fn default_ping_timeout_ms() -> u64 {
    DEFAULT_PING_TIMEOUT.as_millis() as u64
}

impl StreamSettings {
    /// Parse settings from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| StreamError::Configuration(format!("Failed to parse YAML: {}", e)))
    }

    /// Load settings from a YAML file, filling the credential from the
    /// environment when the file has none
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StreamError::Configuration(format!(
                "Failed to load config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut settings = Self::from_yaml(&contents)?;
        if settings.credential.is_none() {
            settings.credential = std::env::var(CREDENTIAL_ENV_VAR)
                .ok()
                .filter(|token| !token.trim().is_empty());
        }

        info!(
            "Loaded stream settings from {} (credential: {})",
            path.display(),
            if settings.credential.is_some() { "yes" } else { "no" }
        );
        Ok(settings)
    }

    /// Start a client builder from these settings
    pub fn into_builder(self) -> EventStreamClientBuilder<HasUrl> {
        EventStreamClientBuilder::new().settings(self)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}
