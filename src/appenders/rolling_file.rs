//! Rolling file appender
//!
//! Writes to `<directory>/<file_name>.log` and rotates that file when it
//! reaches `max_file_size` bytes, or when an hour/day boundary passes if the
//! policy has a time granularity. Rotated files are named by
//! [`FileMeta::file_name`]; at most `max_history` of them are kept.

use super::file_meta::{FileMeta, LOG_EXTENSION};
use crate::core::async_appender::{AsyncAppenderCore, Sink, DEFAULT_QUEUE_CAPACITY};
use crate::core::{
    Appender, AppenderMetrics, Filter, LoggerError, LoggingEvent, PatternEncoder, Result,
    DEFAULT_LAYOUT,
};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, TimeZone, Timelike};
use crossbeam_channel::{after, bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEFAULT_MAX_HISTORY: usize = 5;
const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Time bucket used to name rotated files and to schedule rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGranularity {
    /// Size-based rotation only; rotated files are named by day
    #[default]
    None,
    Hour,
    Day,
}

impl TimeGranularity {
    /// Bucket a rotation at `now` belongs to.
    ///
    /// A timer rotation fires just after a boundary and files the content
    /// under the period that just ended.
    fn bucket(self, now: DateTime<Local>, trigger: Trigger) -> (NaiveDate, Option<u32>) {
        let at = match (self, trigger) {
            (TimeGranularity::Hour, Trigger::Timer) => now - ChronoDuration::hours(1),
            (TimeGranularity::Day, Trigger::Timer) => now - ChronoDuration::days(1),
            _ => now,
        };
        let hour = match self {
            TimeGranularity::Hour => Some(at.hour()),
            TimeGranularity::None | TimeGranularity::Day => None,
        };
        (at.date_naive(), hour)
    }

    /// First boundary strictly after `now`, or `None` without a granularity
    fn next_boundary(self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let naive = match self {
            TimeGranularity::None => return None,
            TimeGranularity::Hour => {
                now.date_naive().and_hms_opt(now.hour(), 0, 0)? + ChronoDuration::hours(1)
            }
            TimeGranularity::Day => now.date_naive().succ_opt()?.and_hms_opt(0, 0, 0)?,
        };
        // A boundary inside a DST gap falls back to one hour from now.
        Some(
            Local
                .from_local_datetime(&naive)
                .earliest()
                .unwrap_or_else(|| now + ChronoDuration::hours(1)),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Size,
    Timer,
}

/// Where and how a [`RollingFileAppender`] keeps its files
///
/// # Example
///
/// ```
/// use hierlog::appenders::{RollingPolicy, TimeGranularity};
///
/// let policy = RollingPolicy::new("/var/log/app/", "server")
///     .with_time_granularity(TimeGranularity::Day)
///     .with_max_history(14)
///     .with_max_file_size(64 * 1024 * 1024);
///
/// let policy = policy.validate().unwrap();
/// assert_eq!(policy.directory, "/var/log/app");
///
/// assert!(RollingPolicy::new("/tmp", "server.log").validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingPolicy {
    pub directory: String,

    /// Name of the active file without the `.log` extension
    pub file_name: String,

    #[serde(default)]
    pub time_granularity: TimeGranularity,

    /// Rotated files to keep
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Active file size in bytes that triggers a rotation
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_history() -> usize {
    DEFAULT_MAX_HISTORY
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl RollingPolicy {
    #[must_use]
    pub fn new(directory: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            time_granularity: TimeGranularity::None,
            max_history: DEFAULT_MAX_HISTORY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_time_granularity(mut self, granularity: TimeGranularity) -> Self {
        self.time_granularity = granularity;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_history(mut self, count: usize) -> Self {
        self.max_history = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Check every field and return a copy with trailing separators removed
    /// from the directory.
    ///
    /// # Errors
    ///
    /// [`LoggerError::InvalidConfiguration`] for an empty directory, an empty
    /// file name or one containing `.` or a path separator, or a zero
    /// `max_history` / `max_file_size`.
    pub fn validate(&self) -> Result<Self> {
        let invalid = |message: String| LoggerError::config("RollingPolicy", message);

        let directory = trim_trailing_separators(&self.directory);
        if directory.is_empty() {
            return Err(invalid("directory must not be empty".to_string()));
        }
        if self.file_name.is_empty() {
            return Err(invalid("file name must not be empty".to_string()));
        }
        if self.file_name.contains('.') {
            return Err(invalid(format!(
                "file name '{}' must not contain '.'",
                self.file_name
            )));
        }
        if self.file_name.contains(is_separator) {
            return Err(invalid(format!(
                "file name '{}' must not contain a path separator",
                self.file_name
            )));
        }
        if self.max_history < 1 {
            return Err(invalid("max history must be at least 1".to_string()));
        }
        if self.max_file_size < 1 {
            return Err(invalid("max file size must be at least 1 byte".to_string()));
        }

        Ok(Self {
            directory,
            ..self.clone()
        })
    }

    /// Path of the file currently being written
    pub fn active_path(&self) -> PathBuf {
        Path::new(&self.directory).join(format!("{}.{}", self.file_name, LOG_EXTENSION))
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == std::path::MAIN_SEPARATOR
}

fn trim_trailing_separators(directory: &str) -> String {
    let trimmed = directory.trim_end_matches(is_separator);
    if trimmed.is_empty() {
        // Keep a bare filesystem root instead of emptying it.
        return directory.chars().take(1).collect();
    }
    trimmed.to_string()
}

/// The active log file plus the rotation procedure
struct RollingFile {
    policy: RollingPolicy,
    active_path: PathBuf,
    file: Option<File>,
    size: u64,
    closed: bool,
    metrics: Arc<AppenderMetrics>,
}

impl RollingFile {
    fn open(policy: RollingPolicy, metrics: Arc<AppenderMetrics>) -> Result<Self> {
        fs::create_dir_all(&policy.directory).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", policy.directory),
                e,
            )
        })?;

        let active_path = policy.active_path();
        let (file, size) = open_active(&active_path)?;
        Ok(Self {
            policy,
            active_path,
            file: Some(file),
            size,
            closed: false,
            metrics,
        })
    }

    fn rotate_if_elapsed(&mut self) -> bool {
        if self.closed || self.size == 0 {
            return false;
        }
        self.rotate(Trigger::Timer, Local::now())
    }

    /// Run one rotation pass and report its outcome.
    ///
    /// Housekeeping failures are reported and otherwise ignored; the appender
    /// keeps writing to whatever file it ends up with.
    fn rotate(&mut self, trigger: Trigger, now: DateTime<Local>) -> bool {
        match self.roll_over(trigger, now) {
            Ok(()) => {
                self.metrics.record_rotation();
                true
            }
            Err(e) => {
                eprintln!("[LOGGER ERROR] {}", e);
                false
            }
        }
    }

    /// Evict old files, move the active file into history and reopen it.
    ///
    /// Nothing is evicted or renamed when the bucket has no free index left.
    fn roll_over(&mut self, trigger: Trigger, now: DateTime<Local>) -> Result<()> {
        let granularity = self.policy.time_granularity;
        let (day, hour) = granularity.bucket(now, trigger);

        let mut history = self.history();
        history.sort_by(FileMeta::cmp_age);
        let excess = (history.len() + 1).saturating_sub(self.policy.max_history);

        let index = next_index(&history[excess..], day, hour).ok_or_else(|| {
            LoggerError::file_rotation(
                self.active_path.display().to_string(),
                format!("no rotation index left for {} {:?}", day, hour),
            )
        })?;
        let rotated = Path::new(&self.policy.directory).join(FileMeta::file_name(
            &self.policy.file_name,
            day,
            hour,
            index,
        ));

        for evicted in history.drain(..excess) {
            if let Err(e) = fs::remove_file(evicted.path()) {
                eprintln!(
                    "[LOGGER WARNING] Failed to remove old log file {}: {}",
                    evicted.path().display(),
                    e
                );
            }
        }

        drop(self.file.take());
        let renamed = fs::rename(&self.active_path, &rotated).map_err(|e| {
            LoggerError::file_rotation(
                self.active_path.display().to_string(),
                format!("cannot rename to {}: {}", rotated.display(), e),
            )
        });

        if let Err(e) = self.reopen() {
            eprintln!("[LOGGER ERROR] {}", e);
        }
        renamed
    }

    /// Rotated files of this policy, excluding the active file
    fn history(&self) -> Vec<FileMeta> {
        let directory = Path::new(&self.policy.directory);
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!(
                    "[LOGGER WARNING] Cannot list log directory {}: {}",
                    directory.display(),
                    e
                );
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                FileMeta::parse(
                    directory,
                    name.to_str()?,
                    &self.policy.file_name,
                    self.policy.time_granularity,
                )
            })
            .collect()
    }

    fn reopen(&mut self) -> Result<()> {
        let (file, size) = open_active(&self.active_path)?;
        self.file = Some(file);
        self.size = size;
        Ok(())
    }
}

/// One past the highest index already used in the bucket, `1` for an empty
/// bucket, `None` once `u32` is exhausted
fn next_index(history: &[FileMeta], day: NaiveDate, hour: Option<u32>) -> Option<u32> {
    match history
        .iter()
        .filter(|meta| meta.in_bucket(day, hour))
        .map(FileMeta::index)
        .max()
    {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

fn open_active(path: &Path) -> Result<(File, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_appender(path.display().to_string(), format!("Failed to open: {}", e))
        })?;
    let size = file
        .metadata()
        .map_err(|e| {
            LoggerError::file_appender(
                path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?
        .len();
    Ok((file, size))
}

impl Sink for RollingFile {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(LoggerError::AppenderDestroyed);
        }
        if self.file.is_none() {
            self.reopen()?;
        }
        let path = &self.active_path;
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| LoggerError::file_appender(path.display().to_string(), "not open"))?;
        file.write_all(bytes)?;
        self.size += bytes.len() as u64;

        if self.size >= self.policy.max_file_size {
            self.rotate(Trigger::Size, Local::now());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        if let Some(mut file) = self.file.take() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Appender writing to a size- and time-rotated log file
///
/// # Example
///
/// ```no_run
/// use hierlog::appenders::{RollingFileAppender, RollingPolicy, TimeGranularity};
///
/// let appender = RollingFileAppender::builder()
///     .layout("%d{ISO8601} [%-5p] %c - %m%n")
///     .policy(
///         RollingPolicy::new("/var/log/app", "server")
///             .with_time_granularity(TimeGranularity::Hour)
///             .with_max_history(48),
///     )
///     .build()
///     .unwrap();
/// ```
pub struct RollingFileAppender {
    core: AsyncAppenderCore<RollingFile>,
    policy: RollingPolicy,
    timer_stop: Mutex<Option<Sender<()>>>,
}

impl RollingFileAppender {
    #[must_use]
    pub fn builder() -> RollingFileAppenderBuilder {
        RollingFileAppenderBuilder::new()
    }

    /// The validated policy
    pub fn policy(&self) -> &RollingPolicy {
        &self.policy
    }

    pub fn active_path(&self) -> PathBuf {
        self.policy.active_path()
    }

    pub fn metrics(&self) -> &AppenderMetrics {
        self.core.metrics()
    }

    /// Perform the boundary rotation now, as the timer would.
    ///
    /// Does nothing if the active file is empty. Returns whether a file was
    /// rotated.
    pub fn rotate_by_timer(&self) -> bool {
        self.core.sink().lock().rotate_if_elapsed()
    }

    fn stop_timer(&self) {
        drop(self.timer_stop.lock().take());
    }
}

impl Appender for RollingFileAppender {
    fn append(&self, event: &LoggingEvent<'_>) {
        self.core.append(event);
    }

    fn destroy(&self) {
        self.stop_timer();
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

fn spawn_timer(
    name: &str,
    granularity: TimeGranularity,
    sink: Arc<Mutex<RollingFile>>,
) -> Result<Option<Sender<()>>> {
    if granularity == TimeGranularity::None {
        return Ok(None);
    }

    let (stop, stopped) = bounded::<()>(0);
    thread::Builder::new()
        .name(format!("hierlog-{}-timer", name))
        .spawn(move || run_timer(granularity, &sink, &stopped))
        .map_err(|e| LoggerError::io_operation("spawn rotation timer", name.to_string(), e))?;
    Ok(Some(stop))
}

fn run_timer(granularity: TimeGranularity, sink: &Mutex<RollingFile>, stopped: &Receiver<()>) {
    loop {
        let now = Local::now();
        let Some(boundary) = granularity.next_boundary(now) else {
            return;
        };
        let wait = (boundary - now)
            .to_std()
            .unwrap_or(Duration::from_secs(1));

        select! {
            recv(stopped) -> _ => return,
            recv(after(wait)) -> _ => {
                sink.lock().rotate_if_elapsed();
            }
        }
    }
}

/// Builder for [`RollingFileAppender`]
pub struct RollingFileAppenderBuilder {
    name: String,
    layout: String,
    filters: Vec<Box<dyn Filter>>,
    policy: Option<RollingPolicy>,
    queue_capacity: usize,
}

impl RollingFileAppenderBuilder {
    pub fn new() -> Self {
        Self {
            name: "rolling-file".to_string(),
            layout: DEFAULT_LAYOUT.to_string(),
            filters: Vec::new(),
            policy: None,
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

    #[must_use = "builder methods return a new value"]
    pub fn filter<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn policy(mut self, policy: RollingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Validate the policy, open the active file and start the consumer and
    /// boundary timer.
    ///
    /// # Errors
    ///
    /// Fails without leaving anything running if the policy is missing or
    /// invalid, the layout does not compile, the directory or file cannot be
    /// created, or a thread cannot be spawned.
    pub fn build(self) -> Result<RollingFileAppender> {
        let policy = self
            .policy
            .ok_or_else(|| {
                LoggerError::config("RollingFileAppender", "a rolling policy is required")
            })?
            .validate()?;
        let encoder = PatternEncoder::compile(&self.layout)?;

        let metrics = Arc::new(AppenderMetrics::new());
        let file = RollingFile::open(policy.clone(), Arc::clone(&metrics))?;
        let core = AsyncAppenderCore::start_with_metrics(
            self.name,
            encoder,
            self.filters,
            self.queue_capacity,
            file,
            metrics,
        )?;

        // Dropping `core` on failure ends the consumer once its empty queue disconnects.
        let timer_stop = spawn_timer(
            core.name(),
            policy.time_granularity,
            Arc::clone(core.sink()),
        )?;

        Ok(RollingFileAppender {
            core,
            policy,
            timer_stop: Mutex::new(timer_stop),
        })
    }
}

impl Default for RollingFileAppenderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
