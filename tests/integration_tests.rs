//! Integration tests for the logger system
//!
//! These tests verify:
//! - End-to-end rendering through registry, handle, appender and layout
//! - Additivity and shadow loggers
//! - Rebinding of handles after reconfiguration
//! - Warnings emitted by the registry through the pipeline itself
//! - Size- and time-triggered rotation of rolling files
//! - Teardown

use chrono::{Duration as ChronoDuration, Local};
use hierlog::appenders::{
    FileMeta, MemorySink, RollingFileAppender, RollingPolicy, TimeGranularity, WriterAppender,
};
use hierlog::core::{Appender, LevelFilter, LogLevel, LoggerRegistry};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const WAIT: Duration = Duration::from_secs(5);
const REFERENCE_LAYOUT: &str = "[%p]-[%c]-[%L] --- %m%n";

fn memory_appender(layout: &str) -> (Arc<dyn Appender>, MemorySink) {
    let sink = MemorySink::new();
    let appender = WriterAppender::builder()
        .layout(layout)
        .writer(sink.clone())
        .build()
        .expect("Failed to build writer appender");
    (Arc::new(appender), sink)
}

/// Poll `sink` until it holds `lines` lines or `WAIT` passes.
fn wait_for_lines(sink: &MemorySink, lines: usize) -> String {
    let start = Instant::now();
    loop {
        let content = sink.contents();
        if content.lines().count() >= lines || start.elapsed() >= WAIT {
            return content;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

fn no_appenders() -> Vec<Arc<dyn Appender>> {
    Vec::new()
}

fn rotated_files(dir: &Path, stem: &str, granularity: TimeGranularity) -> Vec<FileMeta> {
    let mut metas: Vec<FileMeta> = fs::read_dir(dir)
        .expect("Failed to list directory")
        .filter_map(|entry| {
            let name = entry.ok()?.file_name().to_string_lossy().into_owned();
            FileMeta::parse(dir, &name, stem, granularity)
        })
        .collect();
    metas.sort_by(FileMeta::cmp_age);
    metas
}

#[test]
fn test_reference_layout_end_to_end() {
    let (appender, sink) = memory_appender(REFERENCE_LAYOUT);
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    let logger = registry.get_logger("ROOT");

    let line = line!() + 1;
    logger.info("x", &[]);

    assert!(appender.wait_idle(WAIT));
    assert_eq!(
        sink.contents(),
        format!("[INFO]-[ROOT]-[integration_tests.rs:{}] --- x\n", line)
    );
}

#[test]
fn test_root_level_gating() {
    let (appender, sink) = memory_appender("[%p] %m%n");
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    let logger = registry.get_logger("ROOT");

    assert!(!logger.is_trace_enabled());
    assert!(!logger.is_debug_enabled());
    assert!(logger.is_info_enabled());
    assert!(logger.is_warn_enabled());
    assert!(logger.is_error_enabled());

    logger.trace("you cannot see this trace log", &[]);
    logger.debug("you cannot see this debug log", &[]);
    logger.info("you can see this info log", &[]);
    logger.warn("you can see this warn log", &[]);
    logger.error("you can see this error log", &[]);

    assert!(appender.wait_idle(WAIT));
    assert_eq!(
        sink.contents(),
        "[INFO] you can see this info log\n\
         [WARN] you can see this warn log\n\
         [ERROR] you can see this error log\n"
    );
}

#[test]
fn test_root_replacement_rebinds_handles() {
    let (appender, sink) = memory_appender(REFERENCE_LAYOUT);
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    let logger = registry.get_logger("ROOT");

    logger.debug("you cannot see this debug log", &[]);
    assert!(appender.wait_idle(WAIT));
    assert!(sink.take_string().is_empty());

    let new_logger = registry.register("ROOT", LogLevel::Trace, false, [Arc::clone(&appender)]);
    assert!(Arc::ptr_eq(&logger, &new_logger));

    let line = line!() + 1;
    logger.trace("you can see this trace log", &[]);

    assert!(appender.wait_idle(WAIT));
    let content = sink.take_string();
    let mut lines = content.lines();

    // The replacement warning goes out through the previous root first.
    let warning = lines.next().expect("replacement warning");
    assert!(warning.starts_with("[WARN]-[ROOT]-[registry.rs:"), "{}", warning);
    assert!(warning.ends_with("] --- logger 'ROOT' is replaced"), "{}", warning);
    assert_eq!(
        lines.next(),
        Some(
            format!(
                "[TRACE]-[ROOT]-[integration_tests.rs:{}] --- you can see this trace log",
                line
            )
            .as_str()
        )
    );
    assert_eq!(lines.next(), None);
}

#[test]
fn test_replaced_root_delivers_queued_events_and_warning() {
    let sink = MemorySink::new();
    let appender = WriterAppender::builder()
        .layout("[%p]-[%c] %m%n")
        .writer(sink.clone())
        .build()
        .expect("Failed to build writer appender");
    // Only the root holds this appender, so replacing the root releases it.
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::new(appender)]);
    let logger = registry.get_logger("app");

    for i in 0..20 {
        logger.info("msg {}", &[&i]);
    }
    registry.register("ROOT", LogLevel::Info, false, no_appenders());

    let content = wait_for_lines(&sink, 21);
    let mut expected: Vec<String> = (0..20).map(|i| format!("[INFO]-[app] msg {}", i)).collect();
    expected.push("[WARN]-[ROOT] logger 'ROOT' is replaced".to_string());
    assert_eq!(content.lines().collect::<Vec<_>>(), expected);
}

#[test]
fn test_additivity() {
    let (root_appender, root_sink) = memory_appender("root %c %m%n");
    let (child_appender, child_sink) = memory_appender("child %c %m%n");
    let (quiet_appender, quiet_sink) = memory_appender("quiet %c %m%n");

    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&root_appender)]);
    let child = registry.register("svc", LogLevel::Info, true, [Arc::clone(&child_appender)]);
    let quiet = registry.register("batch", LogLevel::Info, false, [Arc::clone(&quiet_appender)]);

    child.info("to both", &[]);
    quiet.info("to one", &[]);

    for appender in [&root_appender, &child_appender, &quiet_appender] {
        assert!(appender.wait_idle(WAIT));
    }
    assert_eq!(root_sink.contents(), "root svc to both\n");
    assert_eq!(child_sink.contents(), "child svc to both\n");
    assert_eq!(quiet_sink.contents(), "quiet batch to one\n");
}

#[test]
fn test_shadow_logger_routes_to_root() {
    let (appender, sink) = memory_appender(REFERENCE_LAYOUT);
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    let logger = registry.get_logger("notExist");

    assert!(!logger.is_debug_enabled());
    let line = line!() + 1;
    logger.warn("you can see this warn log", &[]);

    assert!(appender.wait_idle(WAIT));
    assert_eq!(
        sink.contents(),
        format!(
            "[WARN]-[notExist]-[integration_tests.rs:{}] --- you can see this warn log\n",
            line
        )
    );
    assert!(registry.logger_names().contains(&"notExist".to_string()));
}

#[test]
fn test_shadow_level_follows_root() {
    let registry = LoggerRegistry::with_root(LogLevel::Info, no_appenders());
    let logger = registry.get_logger("notExist");

    let expectations = [
        (LogLevel::Trace, [true, true, true, true, true]),
        (LogLevel::Debug, [false, true, true, true, true]),
        (LogLevel::Info, [false, false, true, true, true]),
        (LogLevel::Warn, [false, false, false, true, true]),
        (LogLevel::Error, [false, false, false, false, true]),
    ];
    for (root_level, enabled) in expectations {
        registry.register("ROOT", root_level, false, no_appenders());
        let actual = [
            logger.is_trace_enabled(),
            logger.is_debug_enabled(),
            logger.is_info_enabled(),
            logger.is_warn_enabled(),
            logger.is_error_enabled(),
        ];
        assert_eq!(actual, enabled, "root at {}", root_level);
    }
}

#[test]
fn test_non_root_replacement_warns_and_rebinds() {
    let (appender, sink) = memory_appender("[%p]-[%c] %m%n");
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    let svc = registry.register("svc", LogLevel::Info, true, no_appenders());
    assert!(svc.is_info_enabled());

    registry.register("svc", LogLevel::Error, true, no_appenders());
    assert!(!svc.is_info_enabled());
    svc.info("suppressed", &[]);
    svc.error("delivered", &[]);

    assert!(appender.wait_idle(WAIT));
    assert_eq!(
        sink.contents(),
        "[WARN]-[ROOT] logger 'svc' is replaced\n[ERROR]-[svc] delivered\n"
    );
}

#[test]
fn test_absent_appender_is_skipped_with_warning() {
    let (root_appender, root_sink) = memory_appender("[%p] %m%n");
    let (child_appender, child_sink) = memory_appender("%m%n");
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&root_appender)]);

    let svc = registry.register(
        "svc",
        LogLevel::Info,
        false,
        [Some(Arc::clone(&child_appender)), None],
    );
    svc.info("only child", &[]);

    assert!(root_appender.wait_idle(WAIT));
    assert!(child_appender.wait_idle(WAIT));
    assert_eq!(
        root_sink.contents(),
        "[WARN] logger 'svc' was given an absent appender, skipping it\n"
    );
    assert_eq!(child_sink.contents(), "only child\n");
    let node = svc.target().expect("bound node");
    assert_eq!(node.appenders().len(), 1);
}

#[test]
fn test_appender_filters_apply_after_level_gate() {
    let sink = MemorySink::new();
    let appender: Arc<dyn Appender> = Arc::new(
        WriterAppender::builder()
            .layout("%p%n")
            .filter(LevelFilter::new(LogLevel::Warn))
            .writer(sink.clone())
            .build()
            .expect("Failed to build writer appender"),
    );
    let registry = LoggerRegistry::with_root(LogLevel::Debug, vec![Arc::clone(&appender)]);
    let logger = registry.get_logger("filtered");

    logger.trace("gated", &[]);
    logger.debug("filtered", &[]);
    logger.warn("kept", &[]);

    assert!(appender.wait_idle(WAIT));
    assert_eq!(sink.contents(), "WARN\n");
}

#[test]
fn test_shutdown_destroys_appenders() {
    let (appender, sink) = memory_appender("%m%n");
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    registry.register("shared", LogLevel::Info, false, [Arc::clone(&appender)]);
    let logger = registry.get_logger("shared");

    registry.shutdown();
    assert!(appender.is_destroyed());

    logger.error("dropped", &[]);
    assert!(sink.is_empty());
}

#[test]
fn test_size_rotation_scenario() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let appender = RollingFileAppender::builder()
        .layout("%m%n")
        .policy(
            RollingPolicy::new(temp_dir.path().to_string_lossy(), "app")
                .with_time_granularity(TimeGranularity::Day)
                .with_max_file_size(100),
        )
        .build()
        .expect("Failed to build rolling appender");
    let appender: Arc<dyn Appender> = Arc::new(appender);
    let registry = LoggerRegistry::with_root(LogLevel::Info, vec![Arc::clone(&appender)]);
    let logger = registry.get_logger("roll");

    // 30 bytes per line: the fourth line crosses 100 bytes.
    let line = "x".repeat(29);
    for _ in 0..4 {
        logger.info("{}", &[&line]);
    }
    assert!(appender.wait_idle(WAIT));

    let rotated = rotated_files(temp_dir.path(), "app", TimeGranularity::Day);
    assert_eq!(rotated.len(), 1);
    assert_eq!(rotated[0].index(), 1);
    assert_eq!(fs::metadata(rotated[0].path()).unwrap().len(), 120);
    assert_eq!(
        fs::metadata(temp_dir.path().join("app.log")).unwrap().len(),
        0
    );
}

#[test]
fn test_retention_never_exceeds_max_history() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let appender = RollingFileAppender::builder()
        .layout("%m%n")
        .policy(
            RollingPolicy::new(temp_dir.path().to_string_lossy(), "app")
                .with_max_history(3)
                .with_max_file_size(10),
        )
        .build()
        .expect("Failed to build rolling appender");

    for i in 0..20 {
        appender.append(&hierlog::LoggingEvent::new(
            "roll",
            LogLevel::Info,
            "message number {}",
            &[&i],
        ));
    }
    assert!(appender.wait_idle(WAIT));

    let rotated = rotated_files(temp_dir.path(), "app", TimeGranularity::None);
    assert_eq!(rotated.len(), 3);
    let mut indexes: Vec<u32> = rotated.iter().map(FileMeta::index).collect();
    indexes.sort_unstable();
    assert_eq!(indexes, vec![1, 2, 3]);
    assert_eq!(appender.metrics().rotations(), 20);
}

#[test]
fn test_daily_timer_rotation() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let appender = RollingFileAppender::builder()
        .layout("%m%n")
        .policy(
            RollingPolicy::new(temp_dir.path().to_string_lossy(), "app")
                .with_time_granularity(TimeGranularity::Day),
        )
        .build()
        .expect("Failed to build rolling appender");

    assert!(!appender.rotate_by_timer());

    appender.append(&hierlog::LoggingEvent::new("roll", LogLevel::Info, "yesterday", &[]));
    assert!(appender.wait_idle(WAIT));
    assert!(appender.rotate_by_timer());

    let rotated = rotated_files(temp_dir.path(), "app", TimeGranularity::Day);
    assert_eq!(rotated.len(), 1);
    assert_eq!(
        rotated[0].day(),
        (Local::now() - ChronoDuration::days(1)).date_naive()
    );
    assert_eq!(fs::read_to_string(rotated[0].path()).unwrap(), "yesterday\n");
}

#[test]
fn test_trailing_separator_directory() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let nested = temp_dir.path().join("nested");
    let directory = format!("{}//", nested.display());

    let appender = RollingFileAppender::builder()
        .layout("%m%n")
        .policy(RollingPolicy::new(directory, "app"))
        .build()
        .expect("Failed to build rolling appender");

    assert_eq!(appender.policy().directory, nested.display().to_string());
    assert_eq!(appender.active_path(), nested.join("app.log"));
    assert!(nested.join("app.log").exists());
}

#[test]
fn test_invalid_policy_is_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let result = RollingFileAppender::builder()
        .policy(RollingPolicy::new(temp_dir.path().to_string_lossy(), "app.log"))
        .build();
    assert!(result.is_err());
    assert!(!temp_dir.path().join("app.log.log").exists());
}
