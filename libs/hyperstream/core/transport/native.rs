use super::EVENT_STREAM_MIME;
use crate::core::client::TransportSink;
use crate::core::event::{Event, MESSAGE_EVENT};
use crate::traits::*;
use async_trait::async_trait;
use eventsource_stream::Event as SseMessage;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Url;
use reqwest_eventsource::{retry, Error as SourceError, Event as SourceEvent, EventSource};
use std::sync::Arc;
use tracing::debug;

/// Adapter from a host-provided primitive to the common signal vocabulary
///
/// Used when no credential is configured. The primitive parses frames
/// itself, so events arrive ready for dispatch.
pub struct NativeTransport {
    connector: Arc<dyn NativeConnector>,
}

impl NativeTransport {
    pub fn new(connector: Arc<dyn NativeConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Transport for NativeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Native
    }

    async fn run(&self, url: Url, sink: TransportSink) {
        let mut signals = self.connector.open(&url);

        while let Some(signal) = signals.next().await {
            if !sink.is_live() {
                debug!("Attempt retired, closing native primitive");
                return;
            }

            match signal {
                NativeSignal::Open => sink.opened(),
                NativeSignal::Frame(event) => sink.event(event),
                NativeSignal::Error { message, closed } => {
                    sink.error(StreamError::Transport(message));
                    if closed {
                        sink.closed();
                        return;
                    }
                }
                NativeSignal::Closed => {
                    sink.closed();
                    return;
                }
            }
        }

        // Primitive ended without announcing it
        sink.closed();
    }
}

/// Default native primitive, backed by [`reqwest_eventsource::EventSource`]
///
/// Sends no credential and no custom headers beyond `Accept`. The built-in
/// retry is disabled, so every error is terminal and recovery stays with the
/// client.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: reqwest::Client,
}

impl HttpEventSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn frame(message: SseMessage) -> Event {
    let event_type = if message.event.is_empty() {
        MESSAGE_EVENT.to_string()
    } else {
        message.event
    };

    Event {
        event_type,
        data: message.data,
        id: (!message.id.is_empty()).then_some(message.id),
    }
}

fn signal(item: std::result::Result<SourceEvent, SourceError>) -> NativeSignal {
    match item {
        Ok(SourceEvent::Open) => NativeSignal::Open,
        Ok(SourceEvent::Message(message)) => NativeSignal::Frame(frame(message)),
        Err(SourceError::StreamEnded) => NativeSignal::Closed,
        Err(SourceError::InvalidStatusCode(status, _)) => NativeSignal::Error {
            message: StreamError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            }
            .to_string(),
            closed: true,
        },
        Err(e) => NativeSignal::Error {
            message: e.to_string(),
            closed: true,
        },
    }
}

impl NativeConnector for HttpEventSource {
    fn open(&self, url: &Url) -> BoxStream<'static, NativeSignal> {
        let request = self
            .client
            .get(url.clone())
            .header(ACCEPT, EVENT_STREAM_MIME);

        let mut source = match EventSource::new(request) {
            Ok(source) => source,
            Err(e) => {
                return stream::iter([NativeSignal::Error {
                    message: e.to_string(),
                    closed: true,
                }])
                .boxed()
            }
        };
        source.set_retry_policy(Box::new(retry::Never));

        source.map(signal).boxed()
    }
}
