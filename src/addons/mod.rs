//! Add-on management.
//!
//! Add-ons are git repositories checked out under `<root>/<owner>/<repo>`.
//! Each may declare other add-ons it needs (`.dependencies`) and an archive
//! to unpack into itself (`.remote`). What is installed, at which commit, is
//! kept in a JSON state file.
//!
//! # Architecture
//!
//! - **types**: Records, references, constants and `AddonError`
//! - **resolver**: `owner/repo` and URL parsing
//! - **process**: `ProcessRunner` seam over external commands
//! - **git**: Clone or fast-forward a checkout
//! - **remote**: `.remote` descriptors, downloads and archive extraction
//! - **storage**: Persistence of the installed state
//! - **github**: Official add-on listing from the GitHub API
//! - **resources**: YAML resource queries over installed add-ons
//! - **installer**: `AddonManager`, the install/remove orchestrator
//!
//! # Usage
//!
//! ```no_run
//! use addon_manager::addons::AddonManager;
//! use addon_manager::config::Config;
//!
//! let config = Config::load()?;
//! let mut manager = AddonManager::new(&config);
//! let installed = manager.install_addons("acme/sensors", false)?;
//! # Ok::<(), addon_manager::addons::AddonError>(())
//! ```

mod git;
mod github;
mod installer;
mod process;
mod remote;
mod resolver;
mod resources;
mod storage;
mod types;

pub use git::{RepoSync, SyncOutcome};
pub use github::{
    AddonListing, DEFAULT_API_ROOT, DEFAULT_OFFICIAL_ORG, GitHubRepo, OfficialClient,
};
pub use installer::{
    AddonManager, FixedPrompt, Prompt, StdinPrompt, dependents_of, is_affirmative,
    read_dependencies,
};
pub use process::{ProcessOutput, ProcessRunner, SystemRunner};
pub use remote::{
    ArchiveFormat, Downloader, HttpDownloader, RemoteDescriptor, RemoteFetcher, RemoteOutcome,
};
pub use resolver::{DEFAULT_HOST, parse_name, split_list};
pub use resources::{find_all, get_field};
pub use storage::{StateError, StateStore};
pub use types::{
    AddonError, AddonRecord, AddonRef, FILENAME_DEPENDENCIES, FILENAME_REMOTE, HASH_SHORT,
    InstalledState, ResourceType, SUPPORTED_TYPES, short_hash,
};
