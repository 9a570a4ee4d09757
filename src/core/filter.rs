//! Event filters evaluated by appenders before encoding

use super::log_level::LogLevel;
use super::logging_event::LoggingEvent;
use serde::{Deserialize, Serialize};

/// Decides whether an appender accepts an event.
///
/// Appenders evaluate their filters in registration order and stop at the
/// first rejection.
pub trait Filter: Send + Sync {
    fn accept(&self, event: &LoggingEvent<'_>) -> bool;
}

/// Accepts events at or above a threshold level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelFilter {
    pub threshold: LogLevel,
}

impl LevelFilter {
    pub fn new(threshold: LogLevel) -> Self {
        Self { threshold }
    }
}

impl Filter for LevelFilter {
    fn accept(&self, event: &LoggingEvent<'_>) -> bool {
        event.level() >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_threshold() {
        let filter = LevelFilter::new(LogLevel::Warn);
        for level in LogLevel::ALL {
            let event = LoggingEvent::new("f", level, "m", &[]);
            assert_eq!(filter.accept(&event), level >= LogLevel::Warn);
        }
    }
}
