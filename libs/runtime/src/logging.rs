use crate::config::{LoggingConfig, Section};
use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{filter::Targets, fmt};

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};

const DEFAULT_SECTION: &str = "default";

// -------- level helpers --------
fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

fn level_filter(s: &str) -> LevelFilter {
    parse_tracing_level(s)
        .map(LevelFilter::from_level)
        .unwrap_or(LevelFilter::OFF)
}

/// Returns true if target == crate_name or target starts with "crate_name::"
fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target == crate_name
        || (target.starts_with(crate_name) && target[crate_name.len()..].starts_with("::"))
}

// -------- rotating writer for files --------
type SharedRotate = Arc<Mutex<FileRotate<AppendCount>>>;

#[derive(Clone)]
struct RotWriterHandle(SharedRotate);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log writer poisoned"))?
            .flush()
    }
}

/// A writer handle that may be None (drops writes).
struct RoutedWriterHandle(Option<RotWriterHandle>);

impl Write for RoutedWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes log records to per-subsystem files by target prefix, falling back
/// to the file of the "default" section.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<SharedRotate>,
    by_prefix: Vec<(String, SharedRotate)>,
}

impl FileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriterHandle> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_crate_prefix(target, prefix))
            .map(|(_, w)| w)
            .or(self.default.as_ref())
            .map(|w| RotWriterHandle(w.clone()))
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = RoutedWriterHandle;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriterHandle(self.default.as_ref().map(|w| RotWriterHandle(w.clone())))
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        RoutedWriterHandle(self.resolve_for(meta.target()))
    }
}

// -------- path resolution helpers --------

/// Resolve a log file path against `base_dir` (home_dir).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Create a size-rotated log file, ensuring the parent directory exists.
fn create_rotating_writer_at_path(
    log_path: &Path,
    section: &Section,
) -> std::io::Result<SharedRotate> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let max_bytes = section.max_size_mb.unwrap_or(100) * 1024 * 1024;
    let rot = FileRotate::new(
        log_path,
        AppendCount::new(section.max_backups.unwrap_or(3)),
        ContentLimit::BytesSurpassed(max_bytes as usize),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(Arc::new(Mutex::new(rot)))
}

fn open_section_file(name: &str, section: &Section, base_dir: &Path) -> Option<SharedRotate> {
    if section.file.trim().is_empty() {
        return None;
    }
    let log_path = resolve_log_path(&section.file, base_dir);
    match create_rotating_writer_at_path(&log_path, section) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.to_string_lossy(),
                e
            );
            None
        }
    }
}

// -------- filters --------

/// Console filter: the "default" section sets the fallback level, every other
/// section overrides the level for its own target prefix.
fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default_level = cfg
        .get(DEFAULT_SECTION)
        .map(|s| level_filter(&s.console_level))
        .unwrap_or(LevelFilter::OFF);

    cfg.iter()
        .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
        .fold(Targets::new().with_default(default_level), |t, (name, s)| {
            t.with_target(name.clone(), level_filter(&s.console_level))
        })
}

/// File filter: only sections that actually have a file participate.
fn file_targets(cfg: &LoggingConfig) -> Targets {
    let has_file = |s: &Section| !s.file.trim().is_empty();

    let default_level = cfg
        .get(DEFAULT_SECTION)
        .filter(|s| has_file(s))
        .map(|s| level_filter(&s.file_level))
        .unwrap_or(LevelFilter::OFF);

    cfg.iter()
        .filter(|(name, s)| name.as_str() != DEFAULT_SECTION && has_file(s))
        .fold(Targets::new().with_default(default_level), |t, (name, s)| {
            t.with_target(name.clone(), level_filter(&s.file_level))
        })
}

fn build_file_router(cfg: &LoggingConfig, base_dir: &Path) -> FileRouter {
    let mut opened: HashMap<PathBuf, SharedRotate> = HashMap::new();
    let mut router = FileRouter::default();

    for (name, section) in cfg {
        let path = resolve_log_path(&section.file, base_dir);
        // Sections pointing at the same file share one writer.
        let writer = match opened.get(&path) {
            Some(w) => Some(w.clone()),
            None => open_section_file(name, section, base_dir).inspect(|w| {
                opened.insert(path.clone(), w.clone());
            }),
        };
        let Some(writer) = writer else { continue };

        if name == DEFAULT_SECTION {
            router.default = Some(writer);
        } else {
            router.by_prefix.push((name.clone(), writer));
        }
    }

    // Longest prefix wins.
    router
        .by_prefix
        .sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    router
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: LoggingConfig containing the logging sections
/// - `base_dir`: base directory used to resolve relative log file paths (usually server.home_dir)
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let ansi = atty::is(atty::Stream::Stdout);

    let console_layer = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg));

    let router = build_file_router(cfg, base_dir);
    let file_layer = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file_targets(cfg))
    });

    let _ = Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

// =================== tests ===================

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
            max_age_days: Some(7),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Info"), Some(Level::INFO));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("invalid"), Some(Level::INFO));
    }

    #[test]
    fn test_crate_prefix_matching() {
        assert!(matches_crate_prefix("schedule", "schedule"));
        assert!(matches_crate_prefix("schedule::domain::service", "schedule"));
        assert!(!matches_crate_prefix("schedule_extra", "schedule"));
        assert!(!matches_crate_prefix("api_ingress", "schedule"));
    }

    #[test]
    fn test_console_targets_default_and_override() {
        let mut cfg = default_logging_config();
        cfg.insert("schedule".into(), section("trace", "", ""));
        cfg.insert("sqlx".into(), section("off", "", ""));

        let targets = console_targets(&cfg);
        assert!(targets.would_enable("schedule::domain", &Level::TRACE));
        assert!(!targets.would_enable("sqlx::query", &Level::ERROR));
        assert!(targets.would_enable("tower_http", &Level::INFO));
        assert!(!targets.would_enable("tower_http", &Level::DEBUG));
    }

    #[test]
    fn test_file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));
    }

    #[test]
    fn test_create_rotating_writer_at_path_creates_parent() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");

        let res = create_rotating_writer_at_path(&p, &section("info", "x", "debug"));
        assert!(res.is_ok(), "writer should be created");
        assert!(p.parent().unwrap().exists(), "parent dir must be created");
    }

    #[test]
    fn test_file_router_prefers_subsystem_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("info", "logs/all.log", "debug"));
        cfg.insert("schedule".into(), section("info", "logs/schedule.log", "debug"));

        let router = build_file_router(&cfg, tmp.path());
        assert!(!router.is_empty());
        assert_eq!(router.by_prefix.len(), 1);

        let sub = router.resolve_for("schedule::api").unwrap();
        let expected = &router.by_prefix[0].1;
        assert!(Arc::ptr_eq(&sub.0, expected));

        let fallback = router.resolve_for("hyper::proto").unwrap();
        assert!(Arc::ptr_eq(&fallback.0, router.default.as_ref().unwrap()));
    }

    #[test]
    fn test_file_router_skips_sections_without_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = LoggingConfig::new();
        cfg.insert("default".into(), section("info", "", "debug"));
        let router = build_file_router(&cfg, tmp.path());
        assert!(router.is_empty());
        assert!(router.resolve_for("anything").is_none());
    }
}
