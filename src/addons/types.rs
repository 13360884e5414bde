//! Add-on type definitions.
//!
//! Core data structures shared by the install/remove pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Number of hex characters shown for abbreviated commit hashes.
pub const HASH_SHORT: usize = 8;

/// Dependency list file inside an add-on repository.
pub const FILENAME_DEPENDENCIES: &str = ".dependencies";

/// Remote content descriptor file inside an add-on repository.
pub const FILENAME_REMOTE: &str = ".remote";

/// Resource types an add-on may ship.
pub const SUPPORTED_TYPES: [&str; 5] = [
    "environments",
    "evaluation",
    "ground_truths",
    "robots",
    "tasks",
];

/// Persisted record for one installed add-on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonRecord {
    /// Full commit SHA currently checked out.
    #[serde(default)]
    pub hash: String,
    /// Canonical names declared in `.dependencies` at install time.
    #[serde(default)]
    pub deps: Vec<String>,
    /// URL of the last remote archive fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    /// Path (relative to the add-on) the archive was extracted into.
    #[serde(
        default,
        alias = "remoteTarget",
        skip_serializing_if = "Option::is_none"
    )]
    pub remote_target: Option<String>,
}

impl AddonRecord {
    /// Returns true if remote content is recorded for this add-on.
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Returns true if the stored remote pair equals the given one.
    #[must_use]
    pub fn remote_matches(&self, url: &str, target: &str) -> bool {
        self.remote.as_deref() == Some(url) && self.remote_target.as_deref() == Some(target)
    }

    /// Returns the abbreviated hash.
    #[must_use]
    pub fn short_hash(&self) -> &str {
        short_hash(&self.hash)
    }
}

/// Everything installed, keyed by canonical name.
pub type InstalledState = BTreeMap<String, AddonRecord>;

/// A resolved add-on reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddonRef {
    /// Clone URL.
    pub url: String,
    /// Repository owner (first namespace level on disk).
    pub owner: String,
    /// Repository name.
    pub repo: String,
}

impl AddonRef {
    /// Returns the canonical `owner/repo` name.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for AddonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A resource category that add-ons can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Simulation environments.
    Environments,
    /// Evaluation methods.
    Evaluation,
    /// Ground truth data.
    GroundTruths,
    /// Robot definitions.
    Robots,
    /// Task definitions.
    Tasks,
}

impl ResourceType {
    /// Parses a type string, rejecting anything outside [`SUPPORTED_TYPES`].
    pub fn parse(value: &str) -> Result<Self, AddonError> {
        match value {
            "environments" => Ok(Self::Environments),
            "evaluation" => Ok(Self::Evaluation),
            "ground_truths" => Ok(Self::GroundTruths),
            "robots" => Ok(Self::Robots),
            "tasks" => Ok(Self::Tasks),
            other => Err(AddonError::UnsupportedType(other.to_string())),
        }
    }

    /// Returns the directory name used for this type.
    #[must_use]
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Environments => "environments",
            Self::Evaluation => "evaluation",
            Self::GroundTruths => "ground_truths",
            Self::Robots => "robots",
            Self::Tasks => "tasks",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Add-on error types.
#[derive(Debug, Error)]
pub enum AddonError {
    /// `git clone` exited non-zero.
    #[error("Failed to clone '{name}' from '{url}'. Are you sure the repository exists?")]
    Clone { name: String, url: String },

    /// A git command on an existing checkout exited non-zero.
    #[error("'git {command}' failed for '{name}': {stderr}")]
    Git {
        name: String,
        command: String,
        stderr: String,
    },

    /// Removal requested for an add-on with no directory on disk.
    #[error("Are you sure add-on '{name}' is installed? It was not found at:\n\t{}", .path.display())]
    NotInstalled { name: String, path: PathBuf },

    /// Resource query with an unknown type.
    #[error("Resource type '{}' is not one of the supported types:\n\t{}", .0, SUPPORTED_TYPES.join(", "))]
    UnsupportedType(String),

    /// An external process could not be started.
    #[error("Failed to run '{program}': {source}")]
    Process {
        program: String,
        #[source]
        source: io::Error,
    },

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// State file could not be read or written.
    #[error("State error: {0}")]
    State(#[from] super::storage::StateError),

    /// Network error talking to the hosting service.
    #[error("Network error: {0}")]
    Network(String),

    /// Hosting API rate limit exceeded.
    #[error("GitHub API rate limit exceeded")]
    RateLimitExceeded,

    /// Archive could not be extracted.
    #[error("Archive error: {0}")]
    Archive(String),

    /// A resource file was not valid YAML.
    #[error("YAML error in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Returns the first [`HASH_SHORT`] characters of a hash.
#[must_use]
pub fn short_hash(hash: &str) -> &str {
    hash.get(..HASH_SHORT).unwrap_or(hash)
}
