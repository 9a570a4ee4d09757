//! Appender trait for log output destinations

use super::logging_event::LoggingEvent;
use std::time::Duration;

/// A destination for logging events.
///
/// `append` is called on the logging thread and must never fail or panic
/// outward; implementations swallow and count their own errors. After
/// `destroy` every further `append` is a no-op.
pub trait Appender: Send + Sync {
    fn append(&self, event: &LoggingEvent<'_>);

    fn destroy(&self);

    fn is_destroyed(&self) -> bool;

    fn name(&self) -> &str;

    /// Block until everything accepted so far has been written, or until
    /// `timeout` elapses. Returns `true` if the appender went idle.
    fn wait_idle(&self, _timeout: Duration) -> bool {
        true
    }
}
