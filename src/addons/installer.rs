//! Install/remove orchestration.
//!
//! [`AddonManager`] drives name resolution, repository sync, remote content
//! and dependency propagation for installs, and dependent-aware removal
//! behind an interactive confirmation. Everything runs sequentially.
//!
//! Progress lines are written to the manager's output sink (stdout in the
//! binary); diagnostics go through `tracing`.

use super::git::{RepoSync, SyncOutcome};
use super::github::{AddonListing, OfficialClient};
use super::process::{ProcessRunner, SystemRunner};
use super::remote::{Downloader, HttpDownloader, RemoteFetcher, RemoteOutcome};
use super::resolver::{parse_name, split_list};
use super::resources;
use super::storage::StateStore;
use super::types::{AddonError, AddonRef, FILENAME_DEPENDENCIES, InstalledState, short_hash};
use crate::config::Config;
use std::fmt::Display;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Answers accepted as confirmation.
const AFFIRMATIVE: [&str; 3] = ["y", "Y", "yes"];

/// Question asked before removing anything.
const CONFIRM_QUESTION: &str = "Are you sure you wish to continue [y/N]? ";

/// Where community add-ons are proposed for the official list.
const COMMUNITY_GUIDE_URL: &str =
    "https://github.com/RoboticVisionOrg/benchbot/wiki/BenchBot-Add-ons";

/// Source of answers to confirmation questions.
pub trait Prompt {
    /// Reads one answer line (without the newline).
    fn read_answer(&mut self) -> String;
}

/// Reads answers from standard input.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn read_answer(&mut self) -> String {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return String::new();
        }
        line.trim_end_matches(['\r', '\n']).to_string()
    }
}

/// Always gives the same answer (`--yes`, tests).
#[derive(Debug, Clone)]
pub struct FixedPrompt(pub String);

impl FixedPrompt {
    /// A prompt that always confirms.
    #[must_use]
    pub fn yes() -> Self {
        Self("y".to_string())
    }

    /// A prompt that always declines.
    #[must_use]
    pub fn no() -> Self {
        Self(String::new())
    }
}

impl Prompt for FixedPrompt {
    fn read_answer(&mut self) -> String {
        self.0.clone()
    }
}

/// Returns true if `answer` confirms the question.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    AFFIRMATIVE.contains(&answer.trim())
}

/// Installed add-ons whose `deps` name one of `targets`, excluding the
/// targets themselves. Single level: dependents of dependents are not added.
#[must_use]
pub fn dependents_of(state: &InstalledState, targets: &[String]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for target in targets {
        for (name, record) in state {
            if record.deps.contains(target)
                && !targets.contains(name)
                && !found.contains(name)
            {
                found.push(name.clone());
            }
        }
    }
    found
}

/// Reads `<dir>/.dependencies`; a missing file means no dependencies.
pub fn read_dependencies(dir: &Path) -> Result<Vec<String>, AddonError> {
    let path = dir.join(FILENAME_DEPENDENCIES);
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(fs::read_to_string(&path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Drives installs and removals against one install root and state file.
pub struct AddonManager {
    install_root: PathBuf,
    store: StateStore,
    runner: Box<dyn ProcessRunner>,
    downloader: Box<dyn Downloader>,
    listing: Box<dyn AddonListing>,
    prompt: Box<dyn Prompt>,
    out: Box<dyn Write>,
}

impl AddonManager {
    /// Creates a manager that shells out to git, downloads over HTTP,
    /// prints to stdout and asks on stdin.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            install_root: config.install_root.clone(),
            store: StateStore::new(config.state_path.clone()),
            runner: Box::new(SystemRunner),
            downloader: Box::new(HttpDownloader::new()),
            listing: Box::new(OfficialClient::new(&config.github_api, &config.official_org)),
            prompt: Box::new(StdinPrompt),
            out: Box::new(io::stdout()),
        }
    }

    /// Replaces the process runner.
    #[must_use]
    pub fn with_runner(mut self, runner: Box<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replaces the archive downloader.
    #[must_use]
    pub fn with_downloader(mut self, downloader: Box<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Replaces the official listing source.
    #[must_use]
    pub fn with_listing(mut self, listing: Box<dyn AddonListing>) -> Self {
        self.listing = listing;
        self
    }

    /// Replaces the confirmation source.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn Prompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Replaces the progress output sink.
    #[must_use]
    pub fn with_output(mut self, out: Box<dyn Write>) -> Self {
        self.out = out;
        self
    }

    /// Returns the state store.
    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Returns the install root.
    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Loads the installed state.
    pub fn state(&self) -> Result<InstalledState, AddonError> {
        Ok(self.store.load()?)
    }

    /// Returns the on-disk directory of an add-on.
    #[must_use]
    pub fn addon_path(&self, addon: &AddonRef) -> PathBuf {
        self.install_root.join(&addon.owner).join(&addon.repo)
    }

    /// Installs every add-on in a comma-separated list, in order.
    ///
    /// Returns every canonical name touched, dependencies included. With
    /// `remove_extras`, installed add-ons outside that set are then offered
    /// for removal (dependents are not expanded).
    pub fn install_addons(&mut self, list: &str, remove_extras: bool) -> Result<Vec<String>, AddonError> {
        let mut installed = Vec::new();
        for name in split_list(list) {
            installed.extend(self.install_addon(&name)?);
        }

        if remove_extras {
            let extras: Vec<String> = self
                .store
                .load()?
                .into_keys()
                .filter(|name| !installed.contains(name))
                .collect();
            if extras.is_empty() {
                debug!("[ADDON-INSTALL] No extra add-ons to remove");
            } else {
                self.say("\nThe following installed add-ons were not requested:");
                self.remove_addons(&extras.join(","), false)?;
            }
        }

        Ok(installed)
    }

    /// Installs (or upgrades) one add-on and, recursively, its dependencies.
    ///
    /// Returns this add-on's canonical name followed by each dependency's
    /// own result, in declared order.
    pub fn install_addon(&mut self, name: &str) -> Result<Vec<String>, AddonError> {
        let mut chain = Vec::new();
        self.install_recursive(name, &mut chain)
    }

    fn install_recursive(&mut self, name: &str, chain: &mut Vec<String>) -> Result<Vec<String>, AddonError> {
        let addon = parse_name(name);
        let canonical = addon.canonical();

        if chain.contains(&canonical) {
            warn!(
                "[ADDON-INSTALL] Dependency cycle: {} -> {}",
                chain.join(" -> "),
                canonical
            );
            self.say(format!(
                "Skipping '{}': already being installed (dependency cycle).",
                canonical
            ));
            return Ok(Vec::new());
        }

        chain.push(canonical);
        let result = self.install_one(&addon, chain);
        chain.pop();
        result
    }

    fn install_one(&mut self, addon: &AddonRef, chain: &mut Vec<String>) -> Result<Vec<String>, AddonError> {
        let name = addon.canonical();
        let install_path = self.addon_path(addon);
        let relative = format!("./{}/{}", addon.owner, addon.repo);

        self.say(format!(
            "Installing addon '{}' in '{}':",
            name,
            self.install_root.display()
        ));

        let created = !install_path.exists();
        if created {
            fs::create_dir_all(&install_path)?;
            self.say(format!("\tCreated install path '{}'.", relative));
        } else {
            self.say(format!("\tFound install path '{}'.", relative));
        }

        let synced = RepoSync::new(self.runner.as_ref()).sync(&name, &install_path, &addon.url);
        let outcome = match synced {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    AddonError::Clone { .. } => {
                        self.say(format!("\tFAILED to clone '{}' from '{}'.", name, addon.url));
                    }
                    other => self.say(format!("\tFAILED to update '{}': {}", name, other)),
                }
                if created {
                    self.discard_failed_clone(&install_path);
                }
                return Err(e);
            }
        };

        match &outcome {
            SyncOutcome::Cloned { .. } => {
                self.say(format!("\tCloned addon from '{}'.", addon.url));
            }
            SyncOutcome::UpToDate { .. } => {
                self.say("\tNo action - latest already installed.");
            }
            SyncOutcome::Upgraded { from, to } => {
                self.say(format!(
                    "\tUpgraded from '{}' to '{}'.",
                    short_hash(from),
                    short_hash(to)
                ));
            }
        }

        let remote =
            RemoteFetcher::new(self.downloader.as_ref(), &self.store).fetch(&name, &install_path)?;
        self.report_remote(&remote);

        let deps = read_dependencies(&install_path)?;
        let dep_names: Vec<String> = deps.iter().map(|d| parse_name(d).canonical()).collect();
        if !deps.is_empty() {
            info!("[ADDON-INSTALL] {} depends on {:?}", name, dep_names);
        }

        let mut installed = vec![name.clone()];
        for dep in &deps {
            installed.extend(self.install_recursive(dep, chain)?);
        }

        let hash = outcome.hash().to_string();
        self.store.update(&name, |record| {
            record.hash = hash;
            record.deps = dep_names;
        })?;
        info!("[ADDON-INSTALL] {} installed at {}", name, short_hash(outcome.hash()));

        Ok(installed)
    }

    fn report_remote(&mut self, remote: &RemoteOutcome) {
        match remote {
            RemoteOutcome::Absent => {}
            RemoteOutcome::AlreadyInstalled(descriptor) => {
                self.say(format!(
                    "\tFound remote content to install to '{}': {}",
                    descriptor.target, descriptor.url
                ));
                self.say("\tNo action - remote content is already installed.");
            }
            RemoteOutcome::Installed {
                descriptor,
                replaced_existing,
            } => {
                self.say(format!(
                    "\tFound remote content to install to '{}': {}",
                    descriptor.target, descriptor.url
                ));
                self.say("\tRemote content is new. Fetched.");
                if *replaced_existing {
                    self.say(format!("\tRemoved existing target '{}'.", descriptor.target));
                }
                self.say(format!("\tExtracted to '{}'.", descriptor.target));
            }
            RemoteOutcome::DownloadFailed { descriptor, reason } => {
                self.say(format!(
                    "\tFound remote content to install to '{}': {}",
                    descriptor.target, descriptor.url
                ));
                self.say(format!("\tFetching of remote content FAILED!!! ({})", reason));
            }
        }
    }

    /// Removes a directory created for a clone that failed.
    fn discard_failed_clone(&mut self, install_path: &Path) {
        if let Err(e) = fs::remove_dir_all(install_path) {
            warn!(
                "[ADDON-INSTALL] Could not remove {}: {}",
                install_path.display(),
                e
            );
            return;
        }
        if let Some(parent) = install_path.parent() {
            if parent != self.install_root && is_empty_dir(parent) {
                if let Err(e) = fs::remove_dir(parent) {
                    warn!("[ADDON-INSTALL] Could not remove {}: {}", parent.display(), e);
                }
            }
        }
    }

    /// Removes one add-on: its directory, its owner directory if now empty,
    /// and its state record.
    pub fn remove_addon(&mut self, name: &str) -> Result<(), AddonError> {
        let addon = parse_name(name);
        let canonical = addon.canonical();
        let install_path = self.addon_path(&addon);

        if !install_path.exists() {
            self.say(format!("FAILED to remove '{}': not installed.", canonical));
            return Err(AddonError::NotInstalled {
                name: canonical,
                path: install_path,
            });
        }

        self.say(format!(
            "Removing addon '{}' in '{}':",
            canonical,
            self.install_root.display()
        ));
        fs::remove_dir_all(&install_path)?;
        self.say(format!(
            "\tRemoved installed directory './{}/{}'",
            addon.owner, addon.repo
        ));

        if let Some(parent) = install_path.parent() {
            if parent != self.install_root && is_empty_dir(parent) {
                fs::remove_dir(parent)?;
                self.say(format!("\tRemoved empty parent directory './{}'", addon.owner));
            }
        }

        if !self.store.remove(&canonical)? {
            debug!("[ADDON-REMOVE] {} had no state record", canonical);
        }
        info!("[ADDON-REMOVE] Removed {}", canonical);
        Ok(())
    }

    /// Removes a comma-separated list of add-ons after confirmation.
    ///
    /// An empty list means every installed add-on. With
    /// `remove_dependents`, add-ons that declare a target as a dependency
    /// are removed too. Returns the names removed; empty if the user
    /// declined.
    pub fn remove_addons(&mut self, list: &str, remove_dependents: bool) -> Result<Vec<String>, AddonError> {
        let state = self.store.load()?;

        let mut targets: Vec<String> = Vec::new();
        let requested: Vec<String> = if list.trim().is_empty() {
            state.keys().cloned().collect()
        } else {
            split_list(list)
                .iter()
                .map(|n| parse_name(n).canonical())
                .collect()
        };
        for name in requested {
            if !targets.contains(&name) {
                targets.push(name);
            }
        }

        if targets.is_empty() {
            self.say("No add-ons to remove.");
            return Ok(Vec::new());
        }

        let dependents = if remove_dependents {
            dependents_of(&state, &targets)
        } else {
            Vec::new()
        };

        self.say("Removing the following requested add-ons:");
        for name in &targets {
            self.say(format!("\t{}", name));
        }
        if !dependents.is_empty() {
            self.say("and the following dependent add-ons:");
            for name in &dependents {
                self.say(format!("\t{}", name));
            }
        }

        self.ask(CONFIRM_QUESTION);
        let answer = self.prompt.read_answer();
        if !is_affirmative(&answer) {
            info!("[ADDON-REMOVE] Removal declined");
            return Ok(Vec::new());
        }
        self.say("");

        targets.extend(dependents);
        for name in &targets {
            self.remove_addon(name)?;
        }
        Ok(targets)
    }

    /// Prints installed add-ons, then the official listing.
    pub fn print_state(&mut self) -> Result<(), AddonError> {
        let state = self.store.load()?;

        self.say("Currently installed add-ons:");
        if state.is_empty() {
            self.say("\tNone.");
        }
        for (name, record) in &state {
            self.say(format!(
                "\t{} ({}{})",
                name,
                record.short_hash(),
                if record.has_remote() {
                    ", with remote content"
                } else {
                    ""
                }
            ));
        }

        let org_url = self.listing.org_url();
        self.say(format!(
            "\nOur GitHub organisation ({}) contains all of our official add-ons.\n\
             The following are available, with more details available at the above URL:",
            org_url
        ));
        self.print_official();

        self.say(format!(
            "\nIf you would like to add your community-created add-on to the official list, \
             please follow the\ninstructions here:\n\t{}",
            COMMUNITY_GUIDE_URL
        ));
        Ok(())
    }

    /// Prints the official add-on listing; a failure is reported, not raised.
    pub fn print_official(&mut self) -> bool {
        match self.listing.official_addons() {
            Ok(names) => {
                for name in names {
                    self.say(format!("\t{}", name));
                }
                true
            }
            Err(e) => {
                warn!("[ADDON-GITHUB] Listing failed: {}", e);
                self.say(format!("\tFAILED to fetch the official add-on list: {}", e));
                false
            }
        }
    }

    /// Absolute paths of installed resources of `resource_type`.
    pub fn find_all(&self, resource_type: &str) -> Result<Vec<PathBuf>, AddonError> {
        resources::find_all(&self.install_root, resource_type)
    }

    /// `field` of every installed resource of `resource_type`.
    pub fn get_field(&self, resource_type: &str, field: &str) -> Result<Vec<serde_yaml::Value>, AddonError> {
        resources::get_field(&self.install_root, resource_type, field)
    }

    fn say(&mut self, line: impl Display) {
        let _ = writeln!(self.out, "{}", line);
    }

    fn ask(&mut self, question: &str) {
        let _ = write!(self.out, "{}", question);
        let _ = self.out.flush();
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_none())
}
