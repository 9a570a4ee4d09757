//! Logging event structure

use super::log_level::LogLevel;
use super::message::format_message;
use chrono::{DateTime, Local};
use std::cell::OnceCell;
use std::fmt;
use std::panic::Location;

/// A single log record.
///
/// Events borrow their template and arguments from the call site; appenders
/// encode them synchronously before anything is queued, so an event never
/// outlives the log statement that produced it. The rendered message is
/// computed on first access and cached for every later reader.
pub struct LoggingEvent<'a> {
    logger_name: &'a str,
    level: LogLevel,
    timestamp: DateTime<Local>,
    file: &'static str,
    line: u32,
    template: &'a str,
    args: &'a [&'a dyn fmt::Display],
    formatted: OnceCell<String>,
}

impl<'a> LoggingEvent<'a> {
    /// Create an event stamped with the current time and the caller's location
    #[track_caller]
    pub fn new(
        logger_name: &'a str,
        level: LogLevel,
        template: &'a str,
        args: &'a [&'a dyn fmt::Display],
    ) -> Self {
        let location = Location::caller();
        Self {
            logger_name,
            level,
            timestamp: Local::now(),
            file: location.file(),
            line: location.line(),
            template,
            args,
            formatted: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, file: &'static str, line: u32) -> Self {
        self.file = file;
        self.line = line;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn logger_name(&self) -> &str {
        self.logger_name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }

    /// Source file as recorded by the compiler (may contain directories)
    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn template(&self) -> &str {
        self.template
    }

    pub fn args(&self) -> &[&'a dyn fmt::Display] {
        self.args
    }

    /// The template with all placeholders substituted.
    pub fn formatted_message(&self) -> &str {
        self.formatted
            .get_or_init(|| format_message(self.template, self.args))
    }
}

impl fmt::Debug for LoggingEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingEvent")
            .field("logger_name", &self.logger_name)
            .field("level", &self.level)
            .field("timestamp", &self.timestamp)
            .field("file", &self.file)
            .field("line", &self.line)
            .field("template", &self.template)
            .field("args", &self.args.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_call_site() {
        let event = LoggingEvent::new("app", LogLevel::Info, "hello", &[]);
        let expected_line = line!() - 1;
        assert_eq!(event.line(), expected_line);
        assert!(event.file().ends_with("logging_event.rs"));
    }

    #[test]
    fn test_formatted_message_is_memoized() {
        let user = "alice";
        let args: [&dyn fmt::Display; 2] = [&user, &7];
        let event = LoggingEvent::new("app", LogLevel::Warn, "{} failed {} times", &args);

        let first = event.formatted_message() as *const str;
        let second = event.formatted_message() as *const str;
        assert_eq!(event.formatted_message(), "alice failed 7 times");
        assert_eq!(first, second);
    }

    #[test]
    fn test_without_args_message_is_template() {
        let event = LoggingEvent::new("app", LogLevel::Debug, "{} stays", &[]);
        assert_eq!(event.formatted_message(), "{} stays");
    }
}
