//! Concrete loggers and additivity dispatch

use super::appender::Appender;
use super::async_appender::panic_message;
use super::log_level::LogLevel;
use super::logging_event::LoggingEvent;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Name under which the root logger is registered
pub const ROOT_LOGGER_NAME: &str = "ROOT";

/// Whether `name` designates the root logger (case-insensitive)
pub fn is_root_name(name: &str) -> bool {
    name.eq_ignore_ascii_case(ROOT_LOGGER_NAME)
}

/// A registered logger configuration.
///
/// Nodes are immutable apart from their parent link, which the registry
/// repoints whenever the root is replaced. Non-root nodes always point at the
/// current root; the root has no parent.
pub struct LoggerNode {
    name: String,
    level: LogLevel,
    additive: bool,
    shadow: bool,
    appenders: Vec<Arc<dyn Appender>>,
    parent: RwLock<Option<Arc<LoggerNode>>>,
}

impl LoggerNode {
    pub(crate) fn root(level: LogLevel, appenders: Vec<Arc<dyn Appender>>) -> Self {
        Self {
            name: ROOT_LOGGER_NAME.to_string(),
            level,
            additive: false,
            shadow: false,
            appenders,
            parent: RwLock::new(None),
        }
    }

    pub(crate) fn child(
        name: impl Into<String>,
        level: LogLevel,
        additive: bool,
        appenders: Vec<Arc<dyn Appender>>,
        root: Arc<LoggerNode>,
    ) -> Self {
        Self {
            name: name.into(),
            level,
            additive,
            shadow: false,
            appenders,
            parent: RwLock::new(Some(root)),
        }
    }

    /// Placeholder for a name nobody registered: takes the root's level and
    /// forwards everything to it.
    pub(crate) fn shadow(name: impl Into<String>, root: Arc<LoggerNode>) -> Self {
        Self {
            name: name.into(),
            level: root.level,
            additive: true,
            shadow: true,
            appenders: Vec::new(),
            parent: RwLock::new(Some(root)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn is_additive(&self) -> bool {
        self.additive
    }

    pub fn is_root(&self) -> bool {
        self.parent.read().is_none()
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn appenders(&self) -> &[Arc<dyn Appender>] {
        &self.appenders
    }

    pub fn parent(&self) -> Option<Arc<LoggerNode>> {
        self.parent.read().clone()
    }

    pub(crate) fn set_parent(&self, parent: Arc<LoggerNode>) {
        *self.parent.write() = Some(parent);
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    /// Hand `event` to this logger's appenders, then to each ancestor's for as
    /// long as the logger just visited is additive.
    pub fn dispatch(&self, event: &LoggingEvent<'_>) {
        self.call_appenders(event);
        if !self.additive {
            return;
        }

        let mut next = self.parent();
        while let Some(node) = next {
            node.call_appenders(event);
            if !node.additive {
                break;
            }
            next = node.parent();
        }
    }

    fn call_appenders(&self, event: &LoggingEvent<'_>) {
        for appender in &self.appenders {
            let result = catch_unwind(AssertUnwindSafe(|| appender.append(event)));
            if let Err(panic_info) = result {
                eprintln!(
                    "[LOGGER CRITICAL] Appender '{}' on logger '{}' panicked: {}. \
                     Other appenders continue to function.",
                    appender.name(),
                    self.name,
                    panic_message(panic_info.as_ref())
                );
            }
        }
    }
}

impl fmt::Debug for LoggerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let appenders: Vec<&str> = self.appenders.iter().map(|a| a.name()).collect();
        f.debug_struct("LoggerNode")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("additive", &self.additive)
            .field("shadow", &self.shadow)
            .field("appenders", &appenders)
            .field("root", &self.is_root())
            .finish()
    }
}
