//! Configuration for the add-on manager.
//!
//! Built once at startup and passed explicitly to every component. Values
//! are layered: built-in defaults, then an optional `addons.toml`, then
//! environment variables. Command-line flags are applied on top by the
//! binary.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::addons::{AddonError, DEFAULT_API_ROOT, DEFAULT_OFFICIAL_ORG};
use crate::logging::{LogConfig, LogLevel};

/// Default install root, relative to the executable's directory.
pub const DEFAULT_INSTALL_LOCATION: &str = ".";

/// Default state file, relative to the executable's directory.
pub const DEFAULT_STATE_PATH: &str = ".state";

/// Config file looked up next to the executable.
pub const CONFIG_FILENAME: &str = "addons.toml";

/// Overrides the install root.
pub const ENV_INSTALL_LOCATION: &str = "INSTALL_LOCATION";

/// Overrides the state file path.
pub const ENV_STATE_PATH: &str = "STATE_PATH";

/// Overrides the config file path.
pub const ENV_CONFIG: &str = "ADDONS_CONFIG";

/// Overrides the official organization.
pub const ENV_ORG: &str = "ADDONS_ORG";

/// Overrides the log level.
pub const ENV_LOG_LEVEL: &str = "ADDONS_LOG_LEVEL";

/// Overrides the log file retention, in hours.
pub const ENV_LOG_RETENTION: &str = "ADDONS_LOG_RETENTION";

/// Maximum config file size (64KB).
const MAX_CONFIG_SIZE: u64 = 64 * 1024;

/// Contents of `addons.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    install_location: Option<String>,
    state_path: Option<String>,
    official_org: Option<String>,
    github_api: Option<String>,
    log_level: Option<String>,
    log_file: Option<bool>,
    log_retention: Option<u32>,
}

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory add-ons are checked out under (`<root>/<owner>/<repo>`).
    pub install_root: PathBuf,
    /// JSON file holding the installed state.
    pub state_path: PathBuf,
    /// Organization listing the official add-ons.
    pub official_org: String,
    /// GitHub API root.
    pub github_api: String,
    /// Logging settings.
    pub log: LogConfig,
}

impl Config {
    /// Creates a config with explicit paths and default everything else.
    #[must_use]
    pub fn with_paths(install_root: PathBuf, state_path: PathBuf) -> Self {
        Self {
            install_root,
            state_path,
            official_org: DEFAULT_OFFICIAL_ORG.to_string(),
            github_api: DEFAULT_API_ROOT.to_string(),
            log: LogConfig::default(),
        }
    }

    /// Loads configuration relative to the running executable.
    pub fn load() -> Result<Self, AddonError> {
        let base = executable_dir();
        Self::load_from(&base, |key| env::var(key).ok())
    }

    /// Loads configuration with `base` as the anchor for relative paths and
    /// `lookup` as the environment.
    pub fn load_from<F>(base: &Path, lookup: F) -> Result<Self, AddonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = lookup(ENV_CONFIG)
            .map(|p| resolve_path(base, &p))
            .unwrap_or_else(|| base.join(CONFIG_FILENAME));
        let file = read_config_file(&config_path)?;

        let install_location = lookup(ENV_INSTALL_LOCATION)
            .or(file.install_location)
            .unwrap_or_else(|| DEFAULT_INSTALL_LOCATION.to_string());
        let state_path = lookup(ENV_STATE_PATH)
            .or(file.state_path)
            .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string());

        let mut log = LogConfig::default();
        if let Some(level) = lookup(ENV_LOG_LEVEL).or(file.log_level) {
            log.level = LogLevel::parse(&level).unwrap_or_else(|| {
                warn!("[CONFIG] Unknown log level '{}', using {}", level, LogLevel::default());
                LogLevel::default()
            });
        }
        if let Some(enabled) = file.log_file {
            log.file = enabled;
        }
        if let Some(hours) = lookup(ENV_LOG_RETENTION)
            .and_then(|v| v.trim().parse().ok())
            .or(file.log_retention)
        {
            log.retention_hours = hours;
        }

        let official_org = lookup(ENV_ORG)
            .or(file.official_org)
            .unwrap_or_else(|| DEFAULT_OFFICIAL_ORG.to_string());
        if official_org.is_empty() || official_org.contains('/') {
            return Err(AddonError::Config(format!(
                "invalid organization name '{}'",
                official_org
            )));
        }

        Ok(Self {
            install_root: resolve_path(base, &install_location),
            state_path: resolve_path(base, &state_path),
            official_org,
            github_api: file
                .github_api
                .unwrap_or_else(|| DEFAULT_API_ROOT.to_string()),
            log,
        })
    }
}

/// Resolves `path` against `base` unless it is already absolute.
#[must_use]
pub fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    let joined = base.join(candidate);
    // Tidy "./" and "x/.." without requiring the path to exist
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Returns the directory holding the running executable.
fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn read_config_file(path: &Path) -> Result<ConfigFile, AddonError> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let metadata = fs::metadata(path)?;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(AddonError::Config(format!(
            "{} is too large (max {} bytes)",
            path.display(),
            MAX_CONFIG_SIZE
        )));
    }

    debug!("[CONFIG] Reading {}", path.display());
    let content = fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| AddonError::Config(format!("{}: {}", path.display(), e)))
}
