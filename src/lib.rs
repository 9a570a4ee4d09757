//! # hierlog
//!
//! Hierarchical, asynchronous logging: named loggers that route to a shared
//! root, appenders with their own queue and consumer thread, a compiled
//! layout language and a size/time rolling file appender.
//!
//! ## Features
//!
//! - **Logger tree**: loggers are registered by name under a single `ROOT`;
//!   unregistered names get a shadow logger that forwards to root
//! - **Lazy handles**: handles returned by the registry rebind themselves
//!   after any reconfiguration
//! - **Asynchronous appenders**: callers only encode and enqueue; a bounded
//!   queue applies backpressure
//! - **Layouts**: `%d{...} [%-5p] %c %L - %m%n` style patterns, validated up
//!   front
//! - **Rolling files**: rotation by size and by hour or day, with bounded
//!   history
//!
//! ## Example
//!
//! ```
//! use hierlog::prelude::*;
//! use hierlog::info;
//! use std::sync::Arc;
//!
//! let sink = MemorySink::new();
//! let appender: Arc<dyn Appender> = Arc::new(
//!     WriterAppender::builder()
//!         .layout("[%p]-[%c] %m%n")
//!         .writer(sink.clone())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let registry = LoggerRegistry::with_root(LogLevel::Info, vec![appender.clone()]);
//! let logger = registry.get_logger("payments");
//! info!(logger, "charged {} cents", 1250);
//!
//! registry.shutdown();
//! ```

pub mod appenders;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{
        MemorySink, RollingFileAppender, RollingPolicy, TimeGranularity, WriterAppender,
    };
    pub use crate::core::{
        Appender, AppenderMetrics, Filter, LevelFilter, LogLevel, Logger, LoggerError,
        LoggerRegistry, LoggingEvent, PatternEncoder, Result, TimestampFormat,
    };
}

pub use appenders::{RollingFileAppender, RollingPolicy, TimeGranularity, WriterAppender};
pub use core::{
    Appender, AppenderMetrics, Filter, LevelFilter, LogLevel, Logger, LoggerError, LoggerNode,
    LoggerRegistry, LoggingEvent, PatternEncoder, Result, TimestampFormat, DEFAULT_LAYOUT,
};
