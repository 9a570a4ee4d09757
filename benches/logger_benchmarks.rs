//! Criterion benchmarks for hierlog

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use hierlog::core::format_message;
use hierlog::prelude::*;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn discarding_appender(layout: &str) -> Arc<dyn Appender> {
    Arc::new(
        WriterAppender::builder()
            .layout(layout)
            .writer(io::sink())
            .build()
            .expect("Failed to build writer appender"),
    )
}

// ============================================================================
// Layout Benchmarks
// ============================================================================

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    group.throughput(Throughput::Elements(1));

    group.bench_function("compile", |b| {
        b.iter(|| PatternEncoder::compile(black_box("%d{%Y-%m-%d %H:%M:%S} [%-5p] %c %L - %m%n")));
    });

    let args: [&dyn std::fmt::Display; 2] = [&"alice", &42];
    let event = LoggingEvent::new("bench", LogLevel::Info, "user {} took {}ms", &args);

    for (name, layout) in [
        ("message_only", "%m%n"),
        ("reference", "[%p]-[%c]-[%L] --- %m%n"),
        ("dated", "%d{%Y-%m-%d %H:%M:%S%.3f} [%-5p] %20c %m%n"),
    ] {
        let encoder = PatternEncoder::compile(layout).expect("valid layout");
        group.bench_function(name, |b| {
            b.iter(|| black_box(encoder.encode(black_box(&event))));
        });
    }

    group.finish();
}

// ============================================================================
// Message Formatting Benchmarks
// ============================================================================

fn bench_format_message(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_message");
    group.throughput(Throughput::Elements(1));

    group.bench_function("no_args", |b| {
        b.iter(|| format_message(black_box("static message"), &[]));
    });

    group.bench_function("three_args", |b| {
        b.iter(|| {
            format_message(
                black_box("request {} from {} finished with {}"),
                &[&"GET /", &"10.0.0.1", &200],
            )
        });
    });

    group.finish();
}

// ============================================================================
// Handle Logging Benchmarks
// ============================================================================

fn bench_handle_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_logging");
    group.throughput(Throughput::Elements(1));

    let appender = discarding_appender("[%p]-[%c] %m%n");
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    let logger = registry.get_logger("bench");

    group.bench_function("enabled", |b| {
        b.iter(|| logger.info(black_box("value {}"), &[&7]));
    });

    group.bench_function("gated", |b| {
        b.iter(|| logger.debug(black_box("value {}"), &[&7]));
    });

    group.bench_function("get_logger", |b| {
        b.iter(|| black_box(registry.get_logger(black_box("bench"))));
    });

    appender.wait_idle(Duration::from_secs(10));
    group.finish();
    registry.shutdown();
}

fn bench_concurrent_logging(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_logging");
    let threads = 4;
    let per_thread = 250;
    group.throughput(Throughput::Elements((threads * per_thread) as u64));

    let appender = discarding_appender("%c %m%n");
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);

    group.bench_function("four_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..threads)
                .map(|t| {
                    let logger = registry.get_logger(&format!("worker.{}", t));
                    thread::spawn(move || {
                        for i in 0..per_thread {
                            logger.info("item {}", &[&i]);
                        }
                    })
                })
                .collect();
            for handle in handles {
                let _ = handle.join();
            }
        });
    });

    appender.wait_idle(Duration::from_secs(10));
    group.finish();
    registry.shutdown();
}

criterion_group!(
    benches,
    bench_layout,
    bench_format_message,
    bench_handle_logging,
    bench_concurrent_logging,
);

criterion_main!(benches);
