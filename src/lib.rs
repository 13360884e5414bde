//! Add-on Manager
//!
//! Installs, upgrades and removes git-hosted add-ons with their
//! dependencies and remote archive content, tracking what is installed in a
//! JSON state file.
//!
//! # Architecture
//!
//! - **Addons Module**: Name resolution, repository sync, remote content,
//!   state persistence and the install/remove orchestrator
//! - **Config Module**: Layered configuration (defaults, file, environment)
//! - **Logging Module**: `tracing` subscriber setup and log file retention
//!
//! # Usage
//!
//! ```no_run
//! use addon_manager::{AddonManager, Config};
//!
//! let config = Config::load()?;
//! let mut manager = AddonManager::new(&config);
//! manager.print_state()?;
//! # Ok::<(), addon_manager::AddonError>(())
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

pub mod addons;
pub mod config;
pub mod logging;

// Re-export main types
pub use addons::{AddonError, AddonManager, StateStore};
pub use config::Config;
pub use logging::{LogConfig, LogLevel};
