//! Throughput Benchmark for proxyrelay
//!
//! This benchmark measures one pump pass (read → parse → drain) with the
//! bundled parsers, using in-memory sources and sinks so only the relay's own
//! work is measured.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use proxyrelay::parser::{Direction, PassthroughParser, RespInspector};
use proxyrelay::session::{transfer, SessionSink};
use std::io;

/// Discards everything written to it.
struct Discard;

impl io::Write for Discard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(black_box(buf).len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Benchmark the pass-through pump at several read sizes
fn bench_passthrough(c: &mut Criterion) {
    let mut group = c.benchmark_group("passthrough");

    for size in [64usize, 1024, 16 * 1024] {
        let payload = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_function(format!("pump_{}", size), |b| {
            let mut parser = PassthroughParser::with_read_size(size);
            let mut sink = SessionSink::new(0);
            b.iter(|| {
                let mut src: &[u8] = &payload;
                transfer(
                    &mut src,
                    &mut Discard,
                    &mut parser,
                    &mut sink,
                    Direction::ClientToServer,
                )
                .unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark the RESP inspector on pipelined commands
fn bench_resp(c: &mut Criterion) {
    let mut payload = Vec::new();
    for i in 0..100 {
        let key = format!("key:{}", i);
        payload.extend_from_slice(
            format!("*3\r\n$3\r\nSET\r\n${}\r\n{}\r\n$5\r\nvalue\r\n", key.len(), key).as_bytes(),
        );
    }

    let mut group = c.benchmark_group("resp");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("pipelined_set_x100", |b| {
        let mut parser = RespInspector::new(Direction::ClientToServer);
        let mut sink = SessionSink::new(0);
        b.iter(|| {
            let mut src: &[u8] = &payload;
            transfer(
                &mut src,
                &mut Discard,
                &mut parser,
                &mut sink,
                Direction::ClientToServer,
            )
            .unwrap();
        });
    });

    group.bench_function("split_frame", |b| {
        let frame = b"*2\r\n$3\r\nGET\r\n$8\r\nuser:101\r\n";
        let (head, tail) = frame.split_at(13);
        let mut parser = RespInspector::new(Direction::ClientToServer);
        let mut sink = SessionSink::new(0);
        b.iter(|| {
            for part in [head, tail] {
                let mut src: &[u8] = part;
                transfer(
                    &mut src,
                    &mut Discard,
                    &mut parser,
                    &mut sink,
                    Direction::ClientToServer,
                )
                .unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_passthrough, bench_resp);
criterion_main!(benches);
