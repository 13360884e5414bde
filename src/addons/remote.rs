//! Remote content: archives hosted outside the add-on repository.
//!
//! An add-on opts in with a `.remote` file whose first line is
//! `<archive-url> <target-path>`. The archive is extracted into
//! `<add-on>/<target-path>`, replacing whatever was there.

use super::storage::StateStore;
use super::types::{AddonError, FILENAME_REMOTE};
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Parsed `.remote` descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDescriptor {
    /// Archive URL.
    pub url: String,
    /// Extraction target, relative to the add-on directory.
    pub target: String,
}

impl RemoteDescriptor {
    /// Parses the first line of a descriptor file. The target must name a
    /// path inside the add-on directory.
    #[must_use]
    pub fn parse(content: &str) -> Option<Self> {
        let line = content.lines().next()?.trim();
        let mut parts = line.split_whitespace();
        let url = parts.next()?;
        let target = parts.next()?;
        if parts.next().is_some() || !stays_inside(target) {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            target: target.to_string(),
        })
    }

    /// Reads `<dir>/.remote`. `Ok(None)` if the file does not exist.
    pub fn read(dir: &Path) -> Result<Option<Self>, AddonError> {
        let path = dir.join(FILENAME_REMOTE);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        match Self::parse(&content) {
            Some(descriptor) => Ok(Some(descriptor)),
            None => {
                warn!("[ADDON-REMOTE] Ignoring malformed {}", path.display());
                Ok(None)
            }
        }
    }

    /// Returns the archive format implied by the URL.
    #[must_use]
    pub fn format(&self) -> ArchiveFormat {
        ArchiveFormat::from_url(&self.url)
    }
}

/// Supported archive formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Zip archive (the default).
    Zip,
    /// Gzip-compressed tarball.
    TarGz,
}

impl ArchiveFormat {
    /// Picks a format from the URL path, defaulting to zip.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        if path.ends_with(".tar.gz") || path.ends_with(".tgz") {
            Self::TarGz
        } else {
            Self::Zip
        }
    }

    /// Extracts `archive` into `dest`, creating it if needed.
    pub fn extract(self, archive: &Path, dest: &Path) -> Result<(), AddonError> {
        fs::create_dir_all(dest)?;
        let file = File::open(archive)?;
        match self {
            Self::Zip => {
                let mut zip = zip::ZipArchive::new(file)
                    .map_err(|e| AddonError::Archive(format!("Failed to open archive: {}", e)))?;
                zip.extract(dest)
                    .map_err(|e| AddonError::Archive(format!("Failed to extract archive: {}", e)))
            }
            Self::TarGz => {
                let decoder = flate2::read::GzDecoder::new(file);
                tar::Archive::new(decoder)
                    .unpack(dest)
                    .map_err(|e| AddonError::Archive(format!("Failed to extract archive: {}", e)))
            }
        }
    }
}

/// Fetches a URL into a local file.
pub trait Downloader {
    /// Downloads `url` into `dest`, overwriting it.
    fn download(&self, url: &str, dest: &Path) -> Result<(), AddonError>;
}

/// Blocking HTTP downloader.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    /// Creates a downloader with a generous timeout for large archives.
    #[must_use]
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent("addon-manager")
            .timeout(Duration::from_secs(60 * 30))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self { client }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<(), AddonError> {
        debug!("[ADDON-REMOTE] GET {}", url);
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AddonError::Network(format!("Download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AddonError::Network(format!(
                "Download failed: {}",
                response.status()
            )));
        }

        let mut file = File::create(dest)?;
        let bytes = response
            .copy_to(&mut file)
            .map_err(|e| AddonError::Network(format!("Failed to read response: {}", e)))?;

        info!("[ADDON-REMOTE] Downloaded {} bytes from {}", bytes, url);
        Ok(())
    }
}

/// Result of the remote content step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// No `.remote` descriptor in the add-on.
    Absent,
    /// The recorded remote pair already matches the descriptor.
    AlreadyInstalled(RemoteDescriptor),
    /// Archive downloaded and extracted.
    Installed {
        descriptor: RemoteDescriptor,
        replaced_existing: bool,
    },
    /// Download failed; the install continues without remote content.
    DownloadFailed {
        descriptor: RemoteDescriptor,
        reason: String,
    },
}

/// Runs the remote content step for one add-on.
pub struct RemoteFetcher<'a> {
    downloader: &'a dyn Downloader,
    store: &'a StateStore,
}

impl<'a> RemoteFetcher<'a> {
    /// Creates a fetcher that records results in `store`.
    #[must_use]
    pub fn new(downloader: &'a dyn Downloader, store: &'a StateStore) -> Self {
        Self { downloader, store }
    }

    /// Fetches remote content for `name` installed at `install_path`.
    ///
    /// Skipped when the stored `(remote, remote_target)` equals the
    /// descriptor. A failed download is not an error.
    pub fn fetch(&self, name: &str, install_path: &Path) -> Result<RemoteOutcome, AddonError> {
        let Some(descriptor) = RemoteDescriptor::read(install_path)? else {
            return Ok(RemoteOutcome::Absent);
        };

        info!(
            "[ADDON-REMOTE] {} declares remote content {} -> {}",
            name, descriptor.url, descriptor.target
        );

        let recorded = self.store.get(name)?;
        if recorded.is_some_and(|r| r.remote_matches(&descriptor.url, &descriptor.target)) {
            debug!("[ADDON-REMOTE] {} remote content already installed", name);
            return Ok(RemoteOutcome::AlreadyInstalled(descriptor));
        }

        let format = descriptor.format();
        let download = tempfile::Builder::new()
            .prefix(".remote-")
            .suffix(match format {
                ArchiveFormat::Zip => ".zip",
                ArchiveFormat::TarGz => ".tar.gz",
            })
            .tempfile()?;

        if let Err(e) = self.downloader.download(&descriptor.url, download.path()) {
            warn!("[ADDON-REMOTE] Fetching {} failed: {}", descriptor.url, e);
            return Ok(RemoteOutcome::DownloadFailed {
                descriptor,
                reason: e.to_string(),
            });
        }

        let target = target_path(install_path, &descriptor.target);
        let replaced_existing = target.exists();
        if replaced_existing {
            remove_path(&target)?;
            debug!("[ADDON-REMOTE] Removed existing {}", target.display());
        }

        format.extract(download.path(), &target)?;
        info!("[ADDON-REMOTE] Extracted {} into {}", descriptor.url, target.display());

        self.store.update(name, |record| {
            record.remote = Some(descriptor.url.clone());
            record.remote_target = Some(descriptor.target.clone());
        })?;

        Ok(RemoteOutcome::Installed {
            descriptor,
            replaced_existing,
        })
    }
}

/// True if `target` is relative, never climbs with `..`, and names
/// something below the directory it is joined to.
fn stays_inside(target: &str) -> bool {
    let mut named = false;
    for component in Path::new(target).components() {
        match component {
            Component::Normal(_) => named = true,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    named
}

/// Joins a descriptor target onto the add-on directory.
fn target_path(install_path: &Path, target: &str) -> PathBuf {
    install_path.join(target)
}

/// Removes a file or a directory tree.
fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}
