//! Writer-backed appender
//!
//! Wraps any `Write + Send` byte sink: stdout, stderr, a socket, or the
//! in-memory [`MemorySink`] used for capturing output.

use crate::core::async_appender::{AsyncAppenderCore, Sink, DEFAULT_QUEUE_CAPACITY};
use crate::core::{
    Appender, AppenderMetrics, Filter, LoggerError, LoggingEvent, PatternEncoder, Result,
    DEFAULT_LAYOUT,
};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Appender that writes encoded events to an arbitrary writer
///
/// # Example
///
/// ```
/// use hierlog::appenders::{MemorySink, WriterAppender};
/// use hierlog::core::{LevelFilter, LogLevel};
///
/// let sink = MemorySink::new();
/// let appender = WriterAppender::builder()
///     .layout("[%p] %m%n")
///     .filter(LevelFilter::new(LogLevel::Warn))
///     .writer(sink.clone())
///     .build()
///     .unwrap();
/// # drop(appender);
/// ```
pub struct WriterAppender {
    core: AsyncAppenderCore<WriterSink>,
}

impl WriterAppender {
    #[must_use]
    pub fn builder() -> WriterAppenderBuilder {
        WriterAppenderBuilder::new()
    }

    /// Appender on stdout with the default layout. Stdout is never closed.
    pub fn stdout() -> Result<Self> {
        Self::builder().name("stdout").writer(io::stdout()).build()
    }

    /// Appender on stderr with the default layout. Stderr is never closed.
    pub fn stderr() -> Result<Self> {
        Self::builder().name("stderr").writer(io::stderr()).build()
    }

    pub fn metrics(&self) -> &AppenderMetrics {
        self.core.metrics()
    }

    pub fn layout(&self) -> &str {
        self.core.encoder().layout()
    }
}

impl Appender for WriterAppender {
    fn append(&self, event: &LoggingEvent<'_>) {
        self.core.append(event);
    }

    fn destroy(&self) {
        self.core.destroy();
    }

    fn is_destroyed(&self) -> bool {
        self.core.is_destroyed()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn wait_idle(&self, timeout: Duration) -> bool {
        self.core.wait_idle(timeout)
    }
}

/// Builder for [`WriterAppender`]
pub struct WriterAppenderBuilder {
    name: String,
    layout: String,
    filters: Vec<Box<dyn Filter>>,
    writer: Option<Box<dyn Write + Send>>,
    owns_writer: bool,
    queue_capacity: usize,
}

impl WriterAppenderBuilder {
    pub fn new() -> Self {
        Self {
            name: "writer".to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
            filters: Vec::new(),
            writer: None,
            owns_writer: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = layout.into();
        self
    }

    /// Add a filter; filters run in the order they were added
    #[must_use = "builder methods return a new value"]
    pub fn filter<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.writer = Some(Box::new(writer));
        self
    }

    /// Whether `destroy` should close (drop) the writer. Defaults to `false`.
    #[must_use = "builder methods return a new value"]
    pub fn owns_writer(mut self, owns: bool) -> Self {
        self.owns_writer = owns;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Compile the layout and start the consumer.
    ///
    /// # Errors
    ///
    /// Fails without starting anything if no writer was supplied, the layout
    /// does not compile, or the queue capacity is zero.
    pub fn build(self) -> Result<WriterAppender> {
        let writer = self
            .writer
            .ok_or_else(|| LoggerError::missing_sink("WriterAppender"))?;
        let encoder = PatternEncoder::compile(&self.layout)?;
        let sink = WriterSink {
            writer: Some(writer),
            owns_writer: self.owns_writer,
        };
        let core = AsyncAppenderCore::start(
            self.name,
            encoder,
            self.filters,
            self.queue_capacity,
            sink,
        )?;
        Ok(WriterAppender { core })
    }
}

impl Default for WriterAppenderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct WriterSink {
    writer: Option<Box<dyn Write + Send>>,
    owns_writer: bool,
}

impl Sink for WriterSink {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::writer("writer already closed"))?;
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.owns_writer {
            if let Some(mut writer) = self.writer.take() {
                writer.flush()?;
            }
        } else if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Cloneable in-memory writer; every clone shares one buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Drain the buffer and return what it held
    pub fn take_string(&self) -> String {
        let bytes = std::mem::take(&mut *self.buffer.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
