//! Common test utilities for HyperStream integration tests
//!
//! - [`MockSseServer`]: minimal HTTP/1.1 server that replays scripted
//!   event-stream responses and records request heads
//! - [`ScriptedTransport`]: in-process transport driven by a step list,
//!   for deterministic virtual-time tests
//! - [`Recorder`]: captures every callback in order

#![allow(dead_code)]

use async_trait::async_trait;
use hyperstream::core::client::TransportSink;
use hyperstream::core::event::{Event, Payload};
use hyperstream::core::handlers::EventHandlers;
use hyperstream::traits::{StreamError, Transport, TransportKind};
use parking_lot::Mutex;
use reqwest::Url;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Scripted response for one accepted connection
#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 event stream; chunks are written with a pause between them
    Stream { chunks: Vec<String>, hold_open: bool },
    /// Bare status with an empty body
    Status(u16),
}

impl Reply {
    pub fn stream(chunks: &[&str]) -> Self {
        Reply::Stream {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            hold_open: false,
        }
    }

    pub fn stream_held(chunks: &[&str]) -> Self {
        Reply::Stream {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            hold_open: true,
        }
    }
}

/// A simple mock event-stream server for testing
///
/// Connection `n` gets `replies[n]`; the last reply repeats.
pub struct MockSseServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown: Arc<Notify>,
}

impl MockSseServer {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(Notify::new());

        let requests_clone = Arc::clone(&requests);
        let shutdown_clone = Arc::clone(&shutdown);
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let reply = replies
                                    .get(served.min(replies.len().saturating_sub(1)))
                                    .cloned()
                                    .unwrap_or(Reply::Status(500));
                                served += 1;

                                let requests = Arc::clone(&requests_clone);
                                let shutdown = Arc::clone(&shutdown_clone);
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, reply, requests, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            requests,
            shutdown,
        }
    }

    async fn handle_connection(
        mut stream: TcpStream,
        reply: Reply,
        requests: Arc<Mutex<Vec<String>>>,
        shutdown: Arc<Notify>,
    ) {
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        requests.lock().push(String::from_utf8_lossy(&head).to_string());

        match reply {
            Reply::Status(code) => {
                let reason = reqwest::StatusCode::from_u16(code)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("");
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    code, reason
                );
                let _ = stream.write_all(response.as_bytes()).await;
            }
            Reply::Stream { chunks, hold_open } => {
                let head = "HTTP/1.1 200 OK\r\n\
                            Content-Type: text/event-stream\r\n\
                            Cache-Control: no-cache\r\n\
                            Connection: close\r\n\r\n";
                if stream.write_all(head.as_bytes()).await.is_err() {
                    return;
                }

                for chunk in chunks {
                    if stream.write_all(chunk.as_bytes()).await.is_err() {
                        return;
                    }
                    let _ = stream.flush().await;
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }

                if hold_open {
                    shutdown.notified().await;
                }
            }
        }

        let _ = stream.shutdown().await;
    }

    pub fn url(&self) -> String {
        format!("http://{}/api/v1/subscribe", self.addr)
    }

    /// Raw request heads received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockSseServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// HTTP client that ignores proxy settings from the environment
pub fn local_http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// One scripted transport action
#[derive(Debug, Clone)]
pub enum Step {
    Open,
    Event(Event),
    Wait(Duration),
    Error(StreamError),
    Close,
    /// Stay connected until cancelled
    Hold,
}

/// Transport that replays a step list per attempt
///
/// Attempt `n` runs `scripts[n]`; the last script repeats.
pub struct ScriptedTransport {
    kind: TransportKind,
    scripts: Vec<Vec<Step>>,
    attempts: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(kind: TransportKind, scripts: Vec<Vec<Step>>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            scripts,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn native(scripts: Vec<Vec<Step>>) -> Arc<Self> {
        Self::new(TransportKind::Native, scripts)
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn run(&self, _url: Url, sink: TransportSink) {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        let index = attempt.min(self.scripts.len().saturating_sub(1));
        let steps = self.scripts.get(index).cloned().unwrap_or_default();

        for step in steps {
            match step {
                Step::Open => sink.opened(),
                Step::Event(event) => sink.event(event),
                Step::Wait(duration) => tokio::time::sleep(duration).await,
                Step::Error(err) => sink.error(err),
                Step::Close => sink.closed(),
                Step::Hold => std::future::pending::<()>().await,
            }
        }
    }
}

/// One observed callback
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Open,
    Message(Payload, Event),
    Ping(String),
    Error(StreamError),
    Reconnecting(u32),
    Reconnected(u32),
    Close,
}

/// Records every callback fired by a client
#[derive(Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Recorder {
    pub fn attach(handlers: &EventHandlers) -> Self {
        let recorder = Self::default();

        let r = recorder.clone();
        handlers.on_open(move || r.push(Record::Open));
        let r = recorder.clone();
        handlers.on_message(move |payload, event| {
            r.push(Record::Message(payload.clone(), event.clone()))
        });
        let r = recorder.clone();
        handlers.on_ping(move |data| r.push(Record::Ping(data.to_string())));
        let r = recorder.clone();
        handlers.on_error(move |err| r.push(Record::Error(err.clone())));
        let r = recorder.clone();
        handlers.on_reconnecting(move |attempt| r.push(Record::Reconnecting(attempt)));
        let r = recorder.clone();
        handlers.on_reconnected(move |attempt| r.push(Record::Reconnected(attempt)));
        let r = recorder.clone();
        handlers.on_close(move || r.push(Record::Close));

        recorder
    }

    fn push(&self, record: Record) {
        self.records.lock().push(record);
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    pub fn opens(&self) -> usize {
        self.count(|r| matches!(r, Record::Open))
    }

    pub fn closes(&self) -> usize {
        self.count(|r| matches!(r, Record::Close))
    }

    pub fn messages(&self) -> Vec<(Payload, Event)> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Message(payload, event) => Some((payload, event)),
                _ => None,
            })
            .collect()
    }

    pub fn pings(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Ping(data) => Some(data),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<StreamError> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn reconnecting(&self) -> Vec<u32> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Reconnecting(attempt) => Some(attempt),
                _ => None,
            })
            .collect()
    }

    pub fn reconnected(&self) -> Vec<u32> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Reconnected(attempt) => Some(attempt),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Record) -> bool) -> usize {
        self.records.lock().iter().filter(|r| predicate(r)).count()
    }
}

/// Poll `condition` every 10ms until it holds or `timeout` elapses
pub async fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
