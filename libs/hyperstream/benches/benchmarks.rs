//! Benchmarks for HyperStream library
//!
//! Run with: cargo bench -p hyperstream

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;

use hyperstream::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use hyperstream::core::dispatcher::Dispatcher;
use hyperstream::core::event::{Event, Payload};
use hyperstream::core::handlers::EventHandlers;
use hyperstream::core::parser::FrameParser;

fn notification_stream(frames: usize) -> String {
    let mut stream = String::new();
    for i in 0..frames {
        if i % 10 == 0 {
            stream.push_str("event: ping\ndata: {}\n\n");
        } else {
            stream.push_str(&format!(
                "event: new_notifications\nid: {}\ndata: {{\"id\":{},\"title\":\"Order filled\",\"read\":false}}\n\n",
                i, i
            ));
        }
    }
    stream
}

/// Benchmark frame parsing
fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    let stream = notification_stream(1000);
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("single_chunk", |b| {
        b.iter(|| {
            let mut parser = FrameParser::new();
            black_box(parser.feed(stream.as_bytes()))
        })
    });

    // Network-sized reads that split frames and lines
    group.bench_function("chunks_of_64", |b| {
        b.iter(|| {
            let mut parser = FrameParser::new();
            let mut events = 0;
            for chunk in stream.as_bytes().chunks(64) {
                events += parser.feed(chunk).len();
            }
            black_box(events)
        })
    });

    group.bench_function("chunks_of_1", |b| {
        let small = notification_stream(50);
        b.iter(|| {
            let mut parser = FrameParser::new();
            let mut events = 0;
            for chunk in small.as_bytes().chunks(1) {
                events += parser.feed(chunk).len();
            }
            black_box(events)
        })
    });

    group.finish();
}

/// Benchmark payload decoding and dispatch
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("decode_structured", |b| {
        let data = r#"{"id":42,"title":"Order filled","read":false}"#;
        b.iter(|| black_box(Payload::decode(black_box(data))))
    });

    group.bench_function("decode_raw_fallback", |b| {
        b.iter(|| black_box(Payload::decode(black_box("hello\nworld"))))
    });

    group.bench_function("dispatch_message", |b| {
        let handlers = Arc::new(EventHandlers::new());
        handlers.on_message(|payload, _| {
            black_box(payload);
        });
        let dispatcher = Dispatcher::new(handlers);
        let event = Event::new("new_notifications", r#"{"id":1}"#);
        b.iter(|| black_box(dispatcher.dispatch(&event)))
    });

    group.finish();
}

/// Benchmark lock-free state and counters
fn bench_atomics(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomics");

    group.bench_function("state_get", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Open);
        b.iter(|| black_box(state.get()))
    });

    group.bench_function("increment_events", |b| {
        let metrics = AtomicMetrics::new();
        b.iter(|| metrics.increment_events())
    });

    group.finish();
}

criterion_group!(benches, bench_parser, bench_dispatch, bench_atomics);

criterion_main!(benches);
