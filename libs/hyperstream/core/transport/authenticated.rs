use super::EVENT_STREAM_MIME;
use crate::core::client::TransportSink;
use crate::core::parser::FrameParser;
use crate::traits::*;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Url;
use tracing::{debug, info};

/// Event-stream reader that carries a bearer credential
///
/// Issues a GET with `Authorization: Bearer <credential>` and
/// `Accept: text/event-stream`, then pulls body chunks through a fresh
/// [`FrameParser`] until the stream ends or fails. A non-2xx status is
/// reported as [`StreamError::HttpStatus`] and ends the attempt; the reader
/// never retries on its own.
pub struct AuthenticatedTransport {
    client: reqwest::Client,
    credential: String,
}

impl AuthenticatedTransport {
    pub fn new(client: reqwest::Client, credential: impl Into<String>) -> Self {
        Self {
            client,
            credential: credential.into(),
        }
    }
}

impl std::fmt::Debug for AuthenticatedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedTransport")
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Report a failure, then end the attempt
fn fail(sink: &TransportSink, err: StreamError) {
    sink.error(err);
    sink.closed();
}

#[async_trait]
impl Transport for AuthenticatedTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Authenticated
    }

    async fn run(&self, url: Url, sink: TransportSink) {
        let request = self
            .client
            .get(url)
            .bearer_auth(&self.credential)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .header(CACHE_CONTROL, "no-cache");

        let mut response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                fail(&sink, e.into());
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            fail(
                &sink,
                StreamError::HttpStatus {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                },
            );
            return;
        }

        sink.opened();

        let mut parser = FrameParser::new();
        loop {
            match response.chunk().await {
                Ok(Some(chunk)) => {
                    for event in parser.feed(&chunk) {
                        sink.event(event);
                    }
                    if !sink.is_live() {
                        debug!("Attempt retired, dropping response body");
                        return;
                    }
                }
                Ok(None) => {
                    if !parser.is_idle() {
                        debug!("Stream ended with a partial frame, discarding it");
                    }
                    info!("Event stream ended by server");
                    sink.closed();
                    return;
                }
                Err(e) => {
                    if sink.is_live() {
                        fail(&sink, e.into());
                    }
                    return;
                }
            }
        }
    }
}
