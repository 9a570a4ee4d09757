//! Core logger types and traits

pub mod appender;
pub mod async_appender;
pub mod converter;
pub mod error;
pub mod filter;
pub mod log_level;
pub mod logger;
pub mod logging_event;
pub mod message;
pub mod metrics;
pub mod pattern;
pub mod registry;
pub mod timestamp;

pub use appender::Appender;
pub use async_appender::{AsyncAppenderCore, Sink, DEFAULT_QUEUE_CAPACITY};
pub use converter::{Alignment, Converter, ConverterKind};
pub use error::{LoggerError, Result};
pub use filter::{Filter, LevelFilter};
pub use log_level::LogLevel;
pub use logger::{LoggerNode, ROOT_LOGGER_NAME};
pub use logging_event::LoggingEvent;
pub use message::format_message;
pub use metrics::AppenderMetrics;
pub use pattern::{PatternEncoder, DEFAULT_LAYOUT};
pub use registry::{Binding, Logger, LoggerRegistry};
pub use timestamp::TimestampFormat;
