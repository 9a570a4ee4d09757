//! Appender implementations

pub mod file_meta;
pub mod rolling_file;
pub mod writer;

pub use file_meta::FileMeta;
pub use rolling_file::{
    RollingFileAppender, RollingFileAppenderBuilder, RollingPolicy, TimeGranularity,
};
pub use writer::{MemorySink, WriterAppender, WriterAppenderBuilder};

pub use crate::core::Appender;
