//! Asynchronous appender pipeline
//!
//! Producers filter and encode on the calling thread, then hand the bytes to
//! a bounded queue. One consumer thread per appender drains the queue in FIFO
//! order and performs the physical write under the sink mutex. A full queue
//! blocks the producer; that is the only backpressure in the system.

use super::error::{LoggerError, Result};
use super::filter::Filter;
use super::logging_event::LoggingEvent;
use super::metrics::AppenderMetrics;
use super::pattern::PatternEncoder;
use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default number of encoded messages an appender may buffer
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Write failures are reported on the first occurrence and then every
/// this many failures.
const FAILURE_REPORT_INTERVAL: u64 = 1000;

/// Physical output behind an appender
pub trait Sink: Send + 'static {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Release the underlying resource; called once on destroy.
    fn close(&mut self) -> Result<()>;
}

/// Shared machinery of every built-in appender
pub struct AsyncAppenderCore<S: Sink> {
    name: String,
    filters: Vec<Box<dyn Filter>>,
    encoder: PatternEncoder,
    sender: Sender<Vec<u8>>,
    /// Dropping the sender disconnects `shutdown_signal`, waking every
    /// blocked producer and the consumer.
    shutdown: Mutex<Option<Sender<()>>>,
    shutdown_signal: Receiver<()>,
    destroyed: Arc<AtomicBool>,
    sink: Arc<Mutex<S>>,
    metrics: Arc<AppenderMetrics>,
}

impl<S: Sink> AsyncAppenderCore<S> {
    /// Start the consumer thread and return the running core.
    ///
    /// # Errors
    ///
    /// Fails if `capacity` is zero or the consumer thread cannot be spawned.
    pub fn start(
        name: impl Into<String>,
        encoder: PatternEncoder,
        filters: Vec<Box<dyn Filter>>,
        capacity: usize,
        sink: S,
    ) -> Result<Self> {
        let metrics = Arc::new(AppenderMetrics::new());
        Self::start_with_metrics(name, encoder, filters, capacity, sink, metrics)
    }

    /// Like [`start`](Self::start), but counting into `metrics`, which the
    /// sink may share.
    pub fn start_with_metrics(
        name: impl Into<String>,
        encoder: PatternEncoder,
        filters: Vec<Box<dyn Filter>>,
        capacity: usize,
        sink: S,
        metrics: Arc<AppenderMetrics>,
    ) -> Result<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(LoggerError::config(&name, "queue capacity must be at least 1"));
        }

        let (sender, receiver) = bounded(capacity);
        let (shutdown, shutdown_signal) = bounded::<()>(0);
        let destroyed = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(Mutex::new(sink));

        let consumer = Consumer {
            name: name.clone(),
            receiver,
            shutdown_signal: shutdown_signal.clone(),
            destroyed: Arc::clone(&destroyed),
            sink: Arc::clone(&sink),
            metrics: Arc::clone(&metrics),
        };
        thread::Builder::new()
            .name(format!("hierlog-{}", name))
            .spawn(move || consumer.run())
            .map_err(|e| {
                LoggerError::io_operation("spawn appender consumer", name.clone(), e)
            })?;

        Ok(Self {
            name,
            filters,
            encoder,
            sender,
            shutdown: Mutex::new(Some(shutdown)),
            shutdown_signal,
            destroyed,
            sink,
            metrics,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn encoder(&self) -> &PatternEncoder {
        &self.encoder
    }

    pub fn metrics(&self) -> &AppenderMetrics {
        &self.metrics
    }

    /// The sink, for housekeeping that must exclude concurrent writes
    pub fn sink(&self) -> &Arc<Mutex<S>> {
        &self.sink
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Filter, encode and enqueue `event`.
    ///
    /// Never fails outward: a panicking filter drops the event, and an event
    /// racing with `destroy` is dropped instead of delivered.
    pub fn append(&self, event: &LoggingEvent<'_>) {
        if self.is_destroyed() {
            return;
        }

        let encoded = catch_unwind(AssertUnwindSafe(|| {
            if self.filters.iter().all(|filter| filter.accept(event)) {
                Some(self.encoder.encode(event))
            } else {
                None
            }
        }));

        let bytes = match encoded {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.metrics.record_filtered();
                return;
            }
            Err(panic_info) => {
                self.metrics.record_dropped();
                eprintln!(
                    "[LOGGER ERROR] Appender '{}' failed while filtering or encoding: {}",
                    self.name,
                    panic_message(panic_info.as_ref())
                );
                return;
            }
        };

        match self.sender.try_send(bytes) {
            Ok(()) => {
                self.metrics.record_enqueued();
            }
            Err(TrySendError::Full(bytes)) => self.enqueue_blocking(bytes),
            Err(TrySendError::Disconnected(_)) => {
                self.metrics.record_dropped();
            }
        }
    }

    fn enqueue_blocking(&self, bytes: Vec<u8>) {
        select! {
            send(self.sender, bytes) -> sent => {
                if sent.is_ok() {
                    self.metrics.record_enqueued();
                } else {
                    self.metrics.record_dropped();
                }
            }
            recv(self.shutdown_signal) -> _ => {
                self.metrics.record_dropped();
            }
        }
    }

    /// Stop accepting events, stop the consumer and release the sink.
    ///
    /// Queued messages that the consumer has not reached yet are discarded.
    /// Calling this more than once has no further effect. Dropping the core
    /// without calling this instead lets the consumer finish the queue and
    /// then release the sink.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.shutdown.lock().take());

        if let Err(e) = self.sink.lock().close() {
            eprintln!(
                "[LOGGER ERROR] Appender '{}' failed to release its sink: {}",
                self.name, e
            );
        }
    }

    /// Poll until the queue has drained or `timeout` passes.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.metrics.pending() == 0 || self.is_destroyed() {
                return self.metrics.pending() == 0;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }
}

struct Consumer<S: Sink> {
    name: String,
    receiver: Receiver<Vec<u8>>,
    shutdown_signal: Receiver<()>,
    destroyed: Arc<AtomicBool>,
    sink: Arc<Mutex<S>>,
    metrics: Arc<AppenderMetrics>,
}

impl<S: Sink> Consumer<S> {
    fn run(self) {
        while !self.destroyed.load(Ordering::Acquire) {
            let bytes = select! {
                recv(self.receiver) -> message => match message {
                    Ok(bytes) => bytes,
                    Err(_) => break,
                },
                recv(self.shutdown_signal) -> _ => break,
            };
            self.write(&bytes);
        }

        // Without an explicit destroy the core was dropped: everything it
        // accepted is still delivered before the sink is released.
        if !self.destroyed.load(Ordering::Acquire) {
            self.drain_and_close();
        }
    }

    fn drain_and_close(&self) {
        for bytes in self.receiver.iter() {
            self.write(&bytes);
        }
        if let Err(e) = self.sink.lock().close() {
            eprintln!(
                "[LOGGER ERROR] Appender '{}' failed to release its sink: {}",
                self.name, e
            );
        }
    }

    /// One supervised write; nothing that happens here may end the loop.
    fn write(&self, bytes: &[u8]) {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.sink.lock().write(bytes)));
        let failure = match outcome {
            Ok(Ok(())) => {
                self.metrics.record_written();
                return;
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic_info) => format!("panicked: {}", panic_message(panic_info.as_ref())),
        };

        let failures = self.metrics.record_write_failure();
        if failures % FAILURE_REPORT_INTERVAL == 0 {
            eprintln!(
                "[LOGGER ERROR] Appender '{}' write failed ({} failures so far): {}",
                self.name,
                failures + 1,
                failure
            );
        }
    }
}

pub(crate) fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::LevelFilter;
    use crate::core::log_level::LogLevel;

    #[derive(Clone, Default)]
    struct VecSink {
        lines: Arc<Mutex<Vec<String>>>,
        fail_on: Option<&'static str>,
        closed: Arc<AtomicBool>,
    }

    impl Sink for VecSink {
        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if let Some(marker) = self.fail_on {
                if text.contains(marker) {
                    return Err(LoggerError::writer("refusing marked message"));
                }
            }
            self.lines.lock().push(text);
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::Release);
            Ok(())
        }
    }

    fn core_with(sink: VecSink, filters: Vec<Box<dyn Filter>>) -> AsyncAppenderCore<VecSink> {
        let encoder = PatternEncoder::compile("%p %m").unwrap();
        AsyncAppenderCore::start("test", encoder, filters, 4, sink).unwrap()
    }

    #[test]
    fn test_fifo_delivery() {
        let sink = VecSink::default();
        let core = core_with(sink.clone(), Vec::new());

        let messages: Vec<String> = (0..50).map(|i| format!("message {}", i)).collect();
        for message in &messages {
            core.append(&LoggingEvent::new("t", LogLevel::Info, message, &[]));
        }

        assert!(core.wait_idle(Duration::from_secs(5)));
        let lines = sink.lines.lock().clone();
        let expected: Vec<String> = messages.iter().map(|m| format!("INFO {}", m)).collect();
        assert_eq!(lines, expected);
        assert_eq!(core.metrics().written(), 50);
    }

    #[test]
    fn test_filters_short_circuit() {
        let sink = VecSink::default();
        let core = core_with(sink.clone(), vec![Box::new(LevelFilter::new(LogLevel::Warn))]);

        core.append(&LoggingEvent::new("t", LogLevel::Info, "hidden", &[]));
        core.append(&LoggingEvent::new("t", LogLevel::Error, "shown", &[]));

        assert!(core.wait_idle(Duration::from_secs(5)));
        assert_eq!(sink.lines.lock().as_slice(), ["ERROR shown"]);
        assert_eq!(core.metrics().filtered(), 1);
    }

    #[test]
    fn test_write_failure_does_not_stop_consumer() {
        let sink = VecSink {
            fail_on: Some("bad"),
            ..VecSink::default()
        };
        let core = core_with(sink.clone(), Vec::new());

        core.append(&LoggingEvent::new("t", LogLevel::Info, "bad one", &[]));
        core.append(&LoggingEvent::new("t", LogLevel::Info, "good one", &[]));

        assert!(core.wait_idle(Duration::from_secs(5)));
        assert_eq!(sink.lines.lock().as_slice(), ["INFO good one"]);
        assert_eq!(core.metrics().write_failures(), 1);
    }

    #[test]
    fn test_destroy_is_idempotent_and_silences_append() {
        let sink = VecSink::default();
        let core = core_with(sink.clone(), Vec::new());

        core.destroy();
        core.destroy();
        assert!(core.is_destroyed());
        assert!(sink.closed.load(Ordering::Acquire));

        core.append(&LoggingEvent::new("t", LogLevel::Error, "after destroy", &[]));
        assert_eq!(core.metrics().enqueued(), 0);
        assert!(sink.lines.lock().is_empty());
    }

    #[test]
    fn test_drop_delivers_queue_then_closes() {
        let sink = VecSink::default();
        let core = core_with(sink.clone(), Vec::new());

        for i in 0..10 {
            core.append(&LoggingEvent::new("t", LogLevel::Info, "queued {}", &[&i]));
        }
        drop(core);

        let start = Instant::now();
        while !sink.closed.load(Ordering::Acquire) && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(sink.closed.load(Ordering::Acquire));

        let expected: Vec<String> = (0..10).map(|i| format!("INFO queued {}", i)).collect();
        assert_eq!(*sink.lines.lock(), expected);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let encoder = PatternEncoder::compile("%m").unwrap();
        let result = AsyncAppenderCore::start("test", encoder, Vec::new(), 0, VecSink::default());
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }
}
