//! Logger registry and lazily bound handles
//!
//! The registry owns the set of concrete [`LoggerNode`]s, always including
//! exactly one root. Callers never hold nodes directly; they hold a [`Logger`]
//! handle obtained by name. A handle binds to its node on first use and is
//! unbound again by every registration, so reconfiguration is picked up on the
//! next log call without callers doing anything.
//!
//! Lock order is registry state, then the handle map, then an individual
//! handle's binding. Every path that takes more than one of them follows it.

use super::appender::Appender;
use super::log_level::LogLevel;
use super::logger::{is_root_name, LoggerNode, ROOT_LOGGER_NAME};
use super::logging_event::LoggingEvent;
use crate::appenders::WriterAppender;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};

struct RegistryState {
    root: Arc<LoggerNode>,
    loggers: HashMap<String, Arc<LoggerNode>>,
}

struct RegistryInner {
    state: RwLock<RegistryState>,
    handles: RwLock<HashMap<String, Arc<Logger>>>,
}

/// Registry of named loggers rooted at `ROOT`
///
/// # Example
///
/// ```
/// use hierlog::appenders::{MemorySink, WriterAppender};
/// use hierlog::core::{Appender, LogLevel, LoggerRegistry};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let sink = MemorySink::new();
/// let appender: Arc<dyn Appender> = Arc::new(
///     WriterAppender::builder()
///         .layout("[%p]-[%c] %m%n")
///         .writer(sink.clone())
///         .build()
///         .unwrap(),
/// );
///
/// let registry = LoggerRegistry::new();
/// registry.register("ROOT", LogLevel::Info, false, [appender.clone()]);
///
/// let logger = registry.get_logger("db");
/// logger.info("pool size {}", &[&8]);
/// logger.debug("not emitted", &[]);
///
/// assert!(appender.wait_idle(Duration::from_secs(5)));
/// assert!(sink.contents().ends_with("[INFO]-[db] pool size 8\n"));
/// ```
#[derive(Clone)]
pub struct LoggerRegistry {
    inner: Arc<RegistryInner>,
}

impl LoggerRegistry {
    /// A registry whose root logs at `Info` to stdout with the default layout.
    #[must_use]
    pub fn new() -> Self {
        let appenders: Vec<Arc<dyn Appender>> = match WriterAppender::stdout() {
            Ok(appender) => vec![Arc::new(appender)],
            Err(e) => {
                eprintln!(
                    "[LOGGER ERROR] Failed to start the default stdout appender: {}",
                    e
                );
                Vec::new()
            }
        };
        Self::with_root(LogLevel::Info, appenders)
    }

    /// A registry whose initial root uses the given configuration.
    #[must_use]
    pub fn with_root(level: LogLevel, appenders: Vec<Arc<dyn Appender>>) -> Self {
        let root = Arc::new(LoggerNode::root(level, appenders));
        let mut loggers = HashMap::new();
        loggers.insert(ROOT_LOGGER_NAME.to_string(), Arc::clone(&root));

        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState { root, loggers }),
                handles: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Create or replace the logger called `name` and return its handle.
    ///
    /// A name equal to `ROOT` in any case replaces the root: additivity is
    /// forced off, every other logger is reparented onto the new root, and all
    /// shadow loggers are dropped so they pick up the new root's level. `None`
    /// items in `appenders` are skipped. Every handle is unbound before this
    /// returns.
    pub fn register<I, A>(
        &self,
        name: &str,
        level: LogLevel,
        additive: bool,
        appenders: I,
    ) -> Arc<Logger>
    where
        I: IntoIterator<Item = A>,
        A: Into<Option<Arc<dyn Appender>>>,
    {
        let mut absent = 0usize;
        let appenders: Vec<Arc<dyn Appender>> = appenders
            .into_iter()
            .filter_map(|appender| {
                let appender = appender.into();
                if appender.is_none() {
                    absent += 1;
                }
                appender
            })
            .collect();

        let key = registry_key(name);
        let (previous_root, replaced) = {
            let mut state = self.inner.state.write();
            let previous_root = Arc::clone(&state.root);
            let replaced = state
                .loggers
                .get(key)
                .map_or(false, |node| !node.is_shadow());

            if is_root_name(name) {
                let root = Arc::new(LoggerNode::root(level, appenders));
                state.loggers.retain(|_, node| !node.is_shadow());
                for node in state.loggers.values() {
                    if !node.is_root() {
                        node.set_parent(Arc::clone(&root));
                    }
                }
                state.loggers.insert(key.to_string(), Arc::clone(&root));
                state.root = root;
            } else {
                let node = LoggerNode::child(
                    name,
                    level,
                    additive,
                    appenders,
                    Arc::clone(&state.root),
                );
                state.loggers.insert(key.to_string(), Arc::new(node));
            }

            for handle in self.inner.handles.read().values() {
                handle.unbind();
            }
            (previous_root, replaced)
        };

        if replaced {
            warn_through(&previous_root, "logger '{}' is replaced", key);
        }
        if absent > 0 {
            warn_through(
                &previous_root,
                "logger '{}' was given an absent appender, skipping it",
                key,
            );
        }

        self.get_logger(name)
    }

    /// The handle for `name`, created unbound on first request.
    ///
    /// Every call with the same name returns the same `Arc`, including calls
    /// racing from different threads.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        let key = registry_key(name);
        if let Some(handle) = self.inner.handles.read().get(key) {
            return Arc::clone(handle);
        }

        let mut handles = self.inner.handles.write();
        let handle = handles.entry(key.to_string()).or_insert_with(|| {
            Arc::new(Logger {
                name: key.to_string(),
                registry: Arc::downgrade(&self.inner),
                binding: RwLock::new(Binding::Unresolved),
            })
        });
        Arc::clone(handle)
    }

    pub fn root(&self) -> Arc<LoggerNode> {
        Arc::clone(&self.inner.state.read().root)
    }

    /// Whether a node exists for `name`, registered or shadow
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .state
            .read()
            .loggers
            .contains_key(registry_key(name))
    }

    /// Names of every node, sorted
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.state.read().loggers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Destroy every appender attached to a current logger.
    ///
    /// Handles stay valid; their events are silently dropped afterwards.
    pub fn shutdown(&self) {
        let appenders: Vec<Arc<dyn Appender>> = {
            let state = self.inner.state.read();
            let mut seen = HashSet::new();
            state
                .loggers
                .values()
                .flat_map(|node| node.appenders().iter())
                .filter(|appender| seen.insert(Arc::as_ptr(*appender) as *const () as usize))
                .cloned()
                .collect()
        };

        for appender in appenders {
            appender.destroy();
        }
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("loggers", &self.logger_names())
            .finish()
    }
}

impl RegistryInner {
    /// Find or create the node for `handle` and bind it, all under the state
    /// lock so no registration can slip in between.
    fn bind(&self, handle: &Logger) -> Arc<LoggerNode> {
        {
            let state = self.state.read();
            if let Some(node) = state.loggers.get(&handle.name) {
                handle.bind(Arc::clone(node));
                return Arc::clone(node);
            }
        }

        let mut state = self.state.write();
        let root = Arc::clone(&state.root);
        let node = Arc::clone(
            state
                .loggers
                .entry(handle.name.clone())
                .or_insert_with(|| Arc::new(LoggerNode::shadow(handle.name.clone(), root))),
        );
        handle.bind(Arc::clone(&node));
        node
    }
}

fn registry_key(name: &str) -> &str {
    if is_root_name(name) {
        ROOT_LOGGER_NAME
    } else {
        name
    }
}

#[track_caller]
fn warn_through(root: &LoggerNode, template: &str, name: &str) {
    if root.appenders().is_empty() {
        eprintln!(
            "[LOGGER WARNING] {}",
            super::message::format_message(template, &[&name])
        );
        return;
    }
    if root.is_enabled(LogLevel::Warn) {
        root.dispatch(&LoggingEvent::new(
            root.name(),
            LogLevel::Warn,
            template,
            &[&name],
        ));
    }
}

/// Resolution state of a [`Logger`] handle
#[derive(Clone, Default)]
pub enum Binding {
    #[default]
    Unresolved,
    Resolved(Arc<LoggerNode>),
}

impl Binding {
    pub fn node(&self) -> Option<Arc<LoggerNode>> {
        match self {
            Binding::Unresolved => None,
            Binding::Resolved(node) => Some(Arc::clone(node)),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Binding::Resolved(_))
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Unresolved => f.write_str("Unresolved"),
            Binding::Resolved(node) => f.debug_tuple("Resolved").field(&node.name()).finish(),
        }
    }
}

/// Long-lived handle to a named logger
///
/// Obtained from [`LoggerRegistry::get_logger`]. All methods are cheap when
/// the handle is already bound; an unbound handle resolves itself first. Once
/// the registry is gone a handle that was never bound does nothing.
pub struct Logger {
    name: String,
    registry: Weak<RegistryInner>,
    binding: RwLock<Binding>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current binding, without resolving
    pub fn binding(&self) -> Binding {
        self.binding.read().clone()
    }

    fn bind(&self, node: Arc<LoggerNode>) {
        *self.binding.write() = Binding::Resolved(node);
    }

    fn unbind(&self) {
        *self.binding.write() = Binding::Unresolved;
    }

    /// The node this handle currently routes to
    pub fn target(&self) -> Option<Arc<LoggerNode>> {
        if let Some(node) = self.binding.read().node() {
            return Some(node);
        }
        let registry = self.registry.upgrade()?;
        Some(registry.bind(self))
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.target().map_or(false, |node| node.is_enabled(level))
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Trace)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Debug)
    }

    pub fn is_info_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Info)
    }

    pub fn is_warn_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Warn)
    }

    pub fn is_error_enabled(&self) -> bool {
        self.is_enabled(LogLevel::Error)
    }

    /// Emit `template` with `args` at `level` if the bound logger allows it.
    #[track_caller]
    pub fn log(&self, level: LogLevel, template: &str, args: &[&dyn fmt::Display]) {
        let Some(node) = self.target() else {
            return;
        };
        if node.is_enabled(level) {
            node.dispatch(&LoggingEvent::new(node.name(), level, template, args));
        }
    }

    #[track_caller]
    pub fn trace(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(LogLevel::Trace, template, args);
    }

    #[track_caller]
    pub fn debug(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(LogLevel::Debug, template, args);
    }

    #[track_caller]
    pub fn info(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(LogLevel::Info, template, args);
    }

    #[track_caller]
    pub fn warn(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(LogLevel::Warn, template, args);
    }

    #[track_caller]
    pub fn error(&self, template: &str, args: &[&dyn fmt::Display]) {
        self.log(LogLevel::Error, template, args);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("binding", &*self.binding.read())
            .finish()
    }
}
