//! Add-on Manager - command-line entry point.
//!
//! Usage: addons [OPTIONS] <COMMAND>
//!
//! Installs, removes and lists add-ons, and queries the resources they
//! provide. Progress goes to stdout, diagnostics to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use addon_manager::addons::{AddonManager, FixedPrompt};
use addon_manager::config::Config;
use addon_manager::logging::{self, LogLevel};

#[derive(Parser)]
#[command(name = "addons")]
#[command(about = "Install and manage git-hosted add-ons")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory add-ons are installed under (overrides INSTALL_LOCATION)
    #[arg(long = "install-root", global = true, value_name = "DIR")]
    install_root: Option<PathBuf>,

    /// State file path (overrides STATE_PATH)
    #[arg(long = "state-path", global = true, value_name = "FILE")]
    state_path: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install or upgrade add-ons and their dependencies
    Install {
        /// Comma-separated add-on names (owner/repo) or URLs
        names: String,

        /// Offer to remove installed add-ons that were not part of this install
        #[arg(long = "remove-extras")]
        remove_extras: bool,
    },

    /// Remove add-ons (all installed add-ons when no names are given)
    Remove {
        /// Comma-separated add-on names (owner/repo) or URLs
        names: Option<String>,

        /// Keep add-ons that depend on the removed ones
        #[arg(long = "no-dependents")]
        no_dependents: bool,

        /// Do not ask for confirmation
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },

    /// Show installed add-ons and the official listing
    List,

    /// Show the official add-on listing
    Official,

    /// Print paths of installed resources of a type
    Find {
        /// Resource type (environments, evaluation, ground_truths, robots, tasks)
        #[arg(value_name = "TYPE")]
        resource_type: String,
    },

    /// Print a field from every installed resource of a type
    Field {
        /// Resource type (environments, evaluation, ground_truths, robots, tasks)
        #[arg(value_name = "TYPE")]
        resource_type: String,

        /// Top-level YAML key to read
        field: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. Returns `Ok(false)` when the command completed but
/// reported a failure of its own.
fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(root) = cli.install_root {
        config.install_root = root;
    }
    if let Some(state) = cli.state_path {
        config.state_path = state;
    }
    if let Some(level) = LogLevel::from_verbosity(cli.verbose) {
        config.log.level = level;
    }

    logging::init(&config.log).context("Failed to initialize logging")?;
    tracing::debug!(
        "Install root: {}, state: {}",
        config.install_root.display(),
        config.state_path.display()
    );

    let mut manager = AddonManager::new(&config);

    match cli.command {
        Commands::Install {
            names,
            remove_extras,
        } => {
            manager.install_addons(&names, remove_extras)?;
        }
        Commands::Remove {
            names,
            no_dependents,
            yes,
        } => {
            if yes {
                manager = manager.with_prompt(Box::new(FixedPrompt::yes()));
            }
            manager.remove_addons(names.as_deref().unwrap_or(""), !no_dependents)?;
        }
        Commands::List => manager.print_state()?,
        Commands::Official => return Ok(manager.print_official()),
        Commands::Find { resource_type } => {
            for path in manager.find_all(&resource_type)? {
                println!("{}", path.display());
            }
        }
        Commands::Field {
            resource_type,
            field,
        } => {
            for value in manager.get_field(&resource_type, &field)? {
                let rendered = serde_yaml::to_string(&value)
                    .with_context(|| format!("Failed to render '{}'", field))?;
                println!("{}", rendered.trim_end());
            }
        }
    }

    Ok(true)
}
