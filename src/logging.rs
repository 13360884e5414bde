//! Diagnostics for the add-on manager.
//!
//! Everything goes to stderr, filtered by the configured level unless
//! `RUST_LOG` is set. A timestamped copy can also be written under
//! `~/.addons/logs/`; copies older than the retention period are pruned
//! whenever a new one is started.

use std::fmt as stdfmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Hours a log file is kept before pruning.
pub const DEFAULT_LOG_RETENTION_HOURS: u32 = 24;

/// Verbosity threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Parses a level name, case-insensitively. Unknown names yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "off" | "none" => Some(Self::Off),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Level selected by repeating `-v`; zero keeps the configured level.
    #[must_use]
    pub fn from_verbosity(count: u8) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Self::Info),
            2 => Some(Self::Debug),
            _ => Some(Self::Trace),
        }
    }

    /// Directive understood by `EnvFilter`.
    #[must_use]
    pub fn directive(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl stdfmt::Display for LogLevel {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        f.write_str(self.directive())
    }
}

/// Logging settings, resolved by [`crate::config::Config`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Also write a log file.
    pub file: bool,
    pub retention_hours: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            file: false,
            retention_hours: DEFAULT_LOG_RETENTION_HOURS,
        }
    }
}

impl LogConfig {
    /// Retention as a duration.
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_hours) * 3600)
    }
}

/// Directory holding log files.
#[derive(Debug, Clone)]
pub struct LogDir {
    path: PathBuf,
}

impl LogDir {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `~/.addons/logs`, or `./.addons/logs` without a home directory.
    #[must_use]
    pub fn default_location() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".addons").join("logs"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path for a log file started now.
    #[must_use]
    pub fn new_log_path(&self) -> PathBuf {
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        self.path.join(format!("addons_{}.log", stamp))
    }

    /// Deletes `*.log` files last modified more than `retention` ago.
    /// Returns how many were deleted.
    ///
    /// # Errors
    /// Returns error if the directory exists but cannot be listed.
    pub fn prune(&self, retention: Duration) -> io::Result<usize> {
        if !self.path.is_dir() {
            return Ok(0);
        }

        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(&self.path)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "log") {
                continue;
            }
            let expired = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > retention);
            if expired && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Installs the global subscriber.
///
/// # Errors
/// Returns error if the log file cannot be created.
pub fn init(config: &LogConfig) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));

    let mut pruned = 0;
    let mut log_path = None;
    let file_layer = if config.file && config.level != LogLevel::Off {
        let dir = LogDir::default_location();
        fs::create_dir_all(dir.path())?;
        pruned = dir.prune(config.retention())?;

        let path = dir.new_log_path();
        let writer = File::create(&path)?;
        log_path = Some(path);
        Some(fmt::layer().with_writer(writer).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(file_layer)
        .init();

    if let Some(path) = log_path {
        tracing::debug!("[LOG] Writing {} ({} stale file(s) pruned)", path.display(), pruned);
    }
    Ok(())
}
