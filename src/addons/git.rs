//! Repository synchronization through the `git` command line.

use super::process::{ProcessOutput, ProcessRunner};
use super::types::{AddonError, short_hash};
use std::path::Path;
use tracing::{debug, info, warn};

const GIT: &str = "git";

/// What a synchronization did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Fresh clone.
    Cloned { hash: String },
    /// Already at the remote default branch.
    UpToDate { hash: String },
    /// Hard-reset from one commit to another.
    Upgraded { from: String, to: String },
}

impl SyncOutcome {
    /// Returns the commit now checked out.
    #[must_use]
    pub fn hash(&self) -> &str {
        match self {
            Self::Cloned { hash } | Self::UpToDate { hash } => hash,
            Self::Upgraded { to, .. } => to,
        }
    }
}

/// Keeps a working copy at the latest default-branch commit.
pub struct RepoSync<'a> {
    runner: &'a dyn ProcessRunner,
}

impl<'a> RepoSync<'a> {
    /// Creates a synchronizer using the given runner.
    #[must_use]
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self { runner }
    }

    /// Clones `url` into `dir` if it has no `.git`, otherwise upgrades it.
    ///
    /// Local modifications are discarded on upgrade.
    pub fn sync(&self, name: &str, dir: &Path, url: &str) -> Result<SyncOutcome, AddonError> {
        if dir.join(".git").exists() {
            self.upgrade(name, dir)
        } else {
            self.clone_into(name, dir, url)
        }
    }

    fn clone_into(&self, name: &str, dir: &Path, url: &str) -> Result<SyncOutcome, AddonError> {
        info!("[ADDON-SYNC] Cloning {} from {}", name, url);
        let out = self.git(dir, &["clone", url, "."])?;
        if !out.success() {
            warn!("[ADDON-SYNC] Clone of {} failed: {}", url, out.stderr.trim());
            return Err(AddonError::Clone {
                name: name.to_string(),
                url: url.to_string(),
            });
        }

        let hash = self.rev_parse(name, dir, "HEAD")?;
        Ok(SyncOutcome::Cloned { hash })
    }

    fn upgrade(&self, name: &str, dir: &Path) -> Result<SyncOutcome, AddonError> {
        let fetch = self.git(dir, &["fetch", "--all"])?;
        if !fetch.success() {
            // Compare against whatever origin/HEAD we already have
            warn!("[ADDON-SYNC] git fetch failed: {}", fetch.stderr.trim());
        }

        let current = self.rev_parse(name, dir, "HEAD")?;
        let latest = self.rev_parse(name, dir, "origin/HEAD")?;
        if current == latest {
            debug!("[ADDON-SYNC] {} already at {}", dir.display(), short_hash(&current));
            return Ok(SyncOutcome::UpToDate { hash: current });
        }

        self.git_checked(name, dir, &["reset", "--hard", "origin/HEAD"])?;

        info!(
            "[ADDON-SYNC] Upgraded {} from {} to {}",
            dir.display(),
            short_hash(&current),
            short_hash(&latest)
        );
        Ok(SyncOutcome::Upgraded {
            from: current,
            to: latest,
        })
    }

    fn rev_parse(&self, name: &str, dir: &Path, rev: &str) -> Result<String, AddonError> {
        let out = self.git_checked(name, dir, &["rev-parse", rev])?;
        Ok(out.stdout_trimmed().to_string())
    }

    /// Runs git and turns a non-zero exit into [`AddonError::Git`].
    fn git_checked(&self, name: &str, dir: &Path, args: &[&str]) -> Result<ProcessOutput, AddonError> {
        let out = self.git(dir, args)?;
        if out.success() {
            return Ok(out);
        }
        let command = args.join(" ");
        warn!("[ADDON-SYNC] git {} failed for {}: {}", command, name, out.stderr.trim());
        Err(AddonError::Git {
            name: name.to_string(),
            command,
            stderr: out.stderr.trim().to_string(),
        })
    }

    fn git(&self, dir: &Path, args: &[&str]) -> Result<ProcessOutput, AddonError> {
        self.runner.run(GIT, args, dir)
    }
}
