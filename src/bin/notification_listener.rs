//! Subscribes to the notification stream and logs everything it receives

use anyhow::Result;
use notification_client::bin_common::{
    init_tracing, parse_args, resolve_config_path, shutdown_signal, BinaryRunner, ConfigType,
    RunConfig,
};
use notification_client::hyperstream::{EventStreamClient, Payload, StreamSettings};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

struct NotificationListener {
    config: RunConfig,
    client: EventStreamClient,
}

impl NotificationListener {
    fn new(client: EventStreamClient) -> Self {
        Self {
            config: RunConfig::new("Notification Listener").with_status_interval(30),
            client,
        }
    }

    fn register_handlers(&self) {
        self.client
            .handlers()
            .on_open(|| info!("Stream open"))
            .on_message(|payload, event| match payload {
                Payload::Structured(Value::Array(items)) => {
                    info!("[{}] {} notification(s)", event.event_type, items.len());
                    for item in items {
                        info!("  {}", item);
                    }
                }
                Payload::Structured(value) => info!("[{}] {}", event.event_type, value),
                Payload::Raw(text) => info!("[{}] {}", event.event_type, text),
            })
            .on_ping(|data| debug!("Ping {}", data))
            .on_error(|err| warn!("Stream error: {}", err))
            .on_reconnecting(|attempt| info!("Reconnecting (attempt {})", attempt))
            .on_reconnected(|attempt| info!("Reconnect attempt {} dispatched", attempt))
            .on_close(|| info!("Stream closed"));
    }

    fn log_status(&self) {
        let metrics = self.client.metrics();
        info!(
            "Status: {} for {}s | events: {} | pings: {} | errors: {} | reconnects: {}",
            metrics.connection_state,
            self.client.connection_duration(),
            metrics.events_received,
            metrics.pings_received,
            metrics.errors,
            metrics.reconnect_count
        );
    }
}

impl BinaryRunner for NotificationListener {
    async fn run(&mut self) -> Result<()> {
        self.register_handlers();
        self.client.connect()?;

        let mut status = tokio::time::interval(Duration::from_secs(self.config.status_interval_secs));
        status.tick().await;

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = status.tick() => self.log_status(),
            }
        }

        self.client.disconnect();
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.config
    }

    fn stats(&self) -> Option<String> {
        let metrics = self.client.metrics();
        Some(format!(
            "Received {} events ({} pings), {} errors, {} reconnects",
            metrics.events_received, metrics.pings_received, metrics.errors, metrics.reconnect_count
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config_path = resolve_config_path(&parse_args(), ConfigType::Stream);
    let settings = StreamSettings::load(&config_path)?;
    let client = settings.into_builder().build()?;
    info!("Client configured: {:?}", client.config());

    let mut app = NotificationListener::new(client);
    app.execute().await
}
