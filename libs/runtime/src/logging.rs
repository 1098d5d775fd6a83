use crate::config::{LoggingConfig, Section};
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Targets, fmt};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

// -------- level helpers --------

/// Unknown names fall back to INFO; "off"/"none" disable the sink.
fn parse_level_filter(s: &str) -> LevelFilter {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" | "none" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// Build per-target filters: the "default" section sets the catch-all level,
/// every other key is a target prefix (crate or module path) with its own level.
fn build_targets<F>(cfg: &LoggingConfig, level_of: F) -> Targets
where
    F: Fn(&Section) -> Option<&str>,
{
    let default_level = cfg
        .get(DEFAULT_SECTION)
        .and_then(&level_of)
        .map(parse_level_filter)
        .unwrap_or(LevelFilter::OFF);

    cfg.iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .fold(
            Targets::new().with_default(default_level),
            |targets, (name, section)| match level_of(section) {
                Some(level) => targets.with_target(name.clone(), parse_level_filter(level)),
                None => targets,
            },
        )
}

fn console_targets(cfg: &LoggingConfig) -> Targets {
    build_targets(cfg, |s| Some(s.console_level.as_str()))
}

fn file_targets(cfg: &LoggingConfig) -> Targets {
    build_targets(cfg, |s| {
        let level = s.file_level.trim();
        (!level.is_empty()).then_some(level)
    })
}

// -------- rotating writer for files --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.0.clone())
    }
}

struct RotWriterHandle(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.0.lock() {
            Ok(mut file) => file.write(buf),
            // A poisoned writer drops the record rather than the process.
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.0.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

// -------- path resolution helpers --------

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Create a rotating writer, ensuring the parent directory exists.
fn create_rotating_writer_at_path(
    log_path: &Path,
    max_bytes: usize,
    max_backups: usize,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(max_backups)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

/// Rotation threshold in bytes; sizes that overflow `usize` fall back to the default.
fn max_bytes_for(section: &Section) -> usize {
    const MIB: u64 = 1024 * 1024;
    let to_bytes = |mb: u64| mb.checked_mul(MIB).and_then(|b| usize::try_from(b).ok());

    section
        .max_size_mb
        .and_then(to_bytes)
        .or_else(|| to_bytes(DEFAULT_MAX_SIZE_MB))
        .unwrap_or(usize::MAX)
}

fn file_writer_for(section: &Section, base_dir: &Path) -> Option<(PathBuf, RotWriter)> {
    if section.file.trim().is_empty() {
        return None;
    }

    let max_bytes = max_bytes_for(section);
    let max_backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let log_path = resolve_log_path(&section.file, base_dir);

    match create_rotating_writer_at_path(&log_path, max_bytes, max_backups) {
        Ok(writer) => Some((log_path, writer)),
        Err(e) => {
            eprintln!(
                "Failed to initialize log file '{}': {e}",
                log_path.to_string_lossy()
            );
            None
        }
    }
}

// -------- public init --------

/// Initialize logging from a configuration.
///
/// Console output is human readable; the optional file sink (taken from the
/// "default" section) receives JSON lines and rotates by size. Returns the
/// path of the file sink when one was opened.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) -> Option<PathBuf> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return None;
    }

    let ansi = std::io::stdout().is_terminal();
    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg));

    let file_sink = cfg
        .get(DEFAULT_SECTION)
        .and_then(|section| file_writer_for(section, base_dir));

    let (file_layer, file_path) = match file_sink {
        Some((path, writer)) => {
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_current_span(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(writer)
                .with_filter(file_targets(cfg));
            (Some(layer), Some(path))
        }
        None => (None, None),
    };

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    file_path
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_logging_config;
    use tempfile::tempdir;

    fn section(console: &str, file: &str, file_level: &str) -> Section {
        Section {
            console_level: console.into(),
            file: file.into(),
            file_level: file_level.into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn level_parsing() {
        assert_eq!(parse_level_filter("trace"), LevelFilter::TRACE);
        assert_eq!(parse_level_filter("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level_filter(" Info "), LevelFilter::INFO);
        assert_eq!(parse_level_filter("warn"), LevelFilter::WARN);
        assert_eq!(parse_level_filter("ERROR"), LevelFilter::ERROR);
        assert_eq!(parse_level_filter("off"), LevelFilter::OFF);
        assert_eq!(parse_level_filter("none"), LevelFilter::OFF);
        assert_eq!(parse_level_filter("loud"), LevelFilter::INFO);
    }

    #[test]
    fn console_targets_use_default_and_overrides() {
        let mut cfg = default_logging_config();
        cfg.insert("sqlx".into(), section("warn", "", ""));

        let targets = console_targets(&cfg);
        assert!(targets.would_enable("users", &tracing::Level::INFO));
        assert!(!targets.would_enable("users", &tracing::Level::DEBUG));
        assert!(targets.would_enable("sqlx::query", &tracing::Level::WARN));
        assert!(!targets.would_enable("sqlx::query", &tracing::Level::INFO));
    }

    #[test]
    fn file_targets_skip_sections_without_level() {
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("info", "logs/x.log", ""));
        cfg.insert("users".into(), section("info", "", "trace"));

        let targets = file_targets(&cfg);
        assert!(!targets.would_enable("api_ingress", &tracing::Level::ERROR));
        assert!(targets.would_enable("users::domain", &tracing::Level::TRACE));
    }

    #[test]
    fn file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));

        let absolute = tmp.path().join("abs.log");
        assert_eq!(
            resolve_log_path(&absolute.to_string_lossy(), Path::new("/elsewhere")),
            absolute
        );
    }

    #[test]
    fn rotating_writer_creates_parent_and_accepts_writes() {
        use tracing_subscriber::fmt::MakeWriter;

        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");

        let writer = create_rotating_writer_at_path(&p, 128 * 1024, 2).unwrap();
        let mut handle = writer.make_writer();
        handle.write_all(b"{\"msg\":\"hello\"}\n").unwrap();
        handle.flush().unwrap();

        assert!(p.parent().unwrap().is_dir());
        let contents = std::fs::read_to_string(&p).unwrap();
        assert!(contents.contains("hello"));
    }

    #[test]
    fn empty_file_disables_file_sink() {
        let tmp = tempdir().unwrap();
        assert!(file_writer_for(&section("info", "  ", "debug"), tmp.path()).is_none());

        let (path, _) = file_writer_for(&section("info", "logs/u.log", "debug"), tmp.path()).unwrap();
        assert_eq!(path, tmp.path().join("logs/u.log"));
    }

    #[test]
    fn rotation_size_is_checked() {
        let mut s = section("info", "logs/u.log", "debug");
        assert_eq!(max_bytes_for(&s), 1024 * 1024);

        s.max_size_mb = None;
        assert_eq!(max_bytes_for(&s), 100 * 1024 * 1024);

        s.max_size_mb = Some(u64::MAX);
        assert_eq!(max_bytes_for(&s), 100 * 1024 * 1024);
    }
}
