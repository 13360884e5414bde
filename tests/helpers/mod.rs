//! Shared fixtures for integration tests.
//!
//! `FakeGit` stands in for the git binary: "remote" repositories live in
//! memory, keyed by URL, and clone/fetch/reset materialize their files on
//! disk. `FakeDownloads` serves archives from local files, and `Output`
//! captures the manager's progress lines.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use addon_manager::addons::{
    AddonError, AddonListing, AddonManager, Downloader, FixedPrompt, ProcessOutput, ProcessRunner,
};
use addon_manager::config::Config;
use tempfile::TempDir;

/// Directory inside a fake checkout holding its bookkeeping.
const GIT_DIR: &str = ".git";

/// One in-memory upstream repository.
#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    pub head: String,
    pub files: Vec<(String, String)>,
}

/// In-memory git server plus a process runner that emulates the git CLI.
#[derive(Clone, Default)]
pub struct FakeGit {
    repos: Rc<RefCell<HashMap<String, FakeRepo>>>,
    calls: Rc<RefCell<Vec<String>>>,
    failing: Rc<RefCell<Vec<String>>>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes (or replaces) `owner/repo` on the fake GitHub host.
    pub fn publish(&self, name: &str, head: &str, files: &[(&str, &str)]) {
        self.publish_url(&format!("https://github.com/{}", name), head, files);
    }

    /// Publishes (or replaces) a repository under an explicit URL.
    pub fn publish_url(&self, url: &str, head: &str, files: &[(&str, &str)]) {
        self.repos.borrow_mut().insert(
            url.to_string(),
            FakeRepo {
                head: head.to_string(),
                files: files
                    .iter()
                    .map(|(p, c)| ((*p).to_string(), (*c).to_string()))
                    .collect(),
            },
        );
    }

    /// Makes every command starting with `prefix` (e.g. `"git reset"`)
    /// exit 1 without touching the checkout.
    pub fn fail(&self, prefix: &str) {
        self.failing.borrow_mut().push(prefix.to_string());
    }

    /// Every command run so far, as `"git <args>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of commands run whose arguments start with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn upstream_of(&self, cwd: &Path) -> Option<FakeRepo> {
        let url = fs::read_to_string(cwd.join(GIT_DIR).join("origin")).ok()?;
        self.repos.borrow().get(url.trim()).cloned()
    }

    fn checkout(cwd: &Path, repo: &FakeRepo) -> io::Result<()> {
        for (path, content) in &repo.files {
            let full = cwd.join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(full, content)?;
        }
        fs::write(cwd.join(GIT_DIR).join("HEAD"), &repo.head)?;
        fs::write(cwd.join(GIT_DIR).join("ORIG_REMOTE"), &repo.head)
    }
}

fn output(code: i32, stdout: &str) -> ProcessOutput {
    ProcessOutput {
        code,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

impl ProcessRunner for FakeGit {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<ProcessOutput, AddonError> {
        let call = format!("{} {}", program, args.join(" "));
        self.calls.borrow_mut().push(call.clone());
        if self.failing.borrow().iter().any(|p| call.starts_with(p.as_str())) {
            return Ok(ProcessOutput {
                code: 1,
                stdout: args.last().copied().unwrap_or_default().to_string(),
                stderr: "fatal: simulated failure".to_string(),
            });
        }
        let git_dir = cwd.join(GIT_DIR);

        let result = match args {
            ["clone", url, "."] => {
                let Some(repo) = self.repos.borrow().get(*url).cloned() else {
                    return Ok(output(128, ""));
                };
                fs::create_dir_all(&git_dir)?;
                fs::write(git_dir.join("origin"), url)?;
                Self::checkout(cwd, &repo)?;
                output(0, "")
            }
            ["fetch", "--all"] => match self.upstream_of(cwd) {
                Some(repo) => {
                    fs::write(git_dir.join("ORIG_REMOTE"), &repo.head)?;
                    output(0, "")
                }
                None => output(1, ""),
            },
            ["rev-parse", "HEAD"] => output(0, &fs::read_to_string(git_dir.join("HEAD"))?),
            ["rev-parse", "origin/HEAD"] => {
                output(0, &fs::read_to_string(git_dir.join("ORIG_REMOTE"))?)
            }
            ["reset", "--hard", "origin/HEAD"] => match self.upstream_of(cwd) {
                Some(repo) => {
                    Self::checkout(cwd, &repo)?;
                    output(0, "")
                }
                None => output(1, ""),
            },
            _ => output(1, ""),
        };
        Ok(result)
    }
}

/// Serves remote archives from local files, keyed by URL.
#[derive(Clone, Default)]
pub struct FakeDownloads {
    archives: Rc<RefCell<HashMap<String, PathBuf>>>,
    count: Rc<Cell<usize>>,
}

impl FakeDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `url` resolve to the archive at `path`.
    pub fn serve(&self, url: &str, path: &Path) {
        self.archives
            .borrow_mut()
            .insert(url.to_string(), path.to_path_buf());
    }

    /// Number of download attempts so far.
    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl Downloader for FakeDownloads {
    fn download(&self, url: &str, dest: &Path) -> Result<(), AddonError> {
        self.count.set(self.count.get() + 1);
        let source = self.archives.borrow().get(url).cloned();
        match source {
            Some(path) => {
                fs::copy(path, dest)?;
                Ok(())
            }
            None => Err(AddonError::Network(format!("404 Not Found: {}", url))),
        }
    }
}

/// Fixed official listing.
pub struct FakeListing(pub Result<Vec<String>, String>);

impl AddonListing for FakeListing {
    fn org_url(&self) -> String {
        "https://github.com/benchbot-addons".to_string()
    }

    fn official_addons(&self) -> Result<Vec<String>, AddonError> {
        self.0.clone().map_err(AddonError::Network)
    }
}

/// Captured progress output.
#[derive(Clone, Default)]
pub struct Output(Rc<RefCell<Vec<u8>>>);

impl Output {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A scratch install root with fakes wired in.
pub struct TestEnv {
    pub dir: TempDir,
    pub git: FakeGit,
    pub downloads: FakeDownloads,
    pub out: Output,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
            git: FakeGit::new(),
            downloads: FakeDownloads::new(),
            out: Output::default(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("addons")
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join(".state")
    }

    pub fn config(&self) -> Config {
        Config::with_paths(self.root(), self.state_path())
    }

    /// A manager whose confirmation prompt always answers `answer`.
    pub fn manager_answering(&self, answer: &str) -> AddonManager {
        AddonManager::new(&self.config())
            .with_runner(Box::new(self.git.clone()))
            .with_downloader(Box::new(self.downloads.clone()))
            .with_listing(Box::new(FakeListing(Ok(vec![
                "benchbot-addons/tasks_base".to_string(),
                "benchbot-addons/robots_sim".to_string(),
            ]))))
            .with_prompt(Box::new(FixedPrompt(answer.to_string())))
            .with_output(Box::new(self.out.clone()))
    }

    pub fn manager(&self) -> AddonManager {
        self.manager_answering("y")
    }

    /// Writes a zip archive with the given entries and returns its path.
    pub fn zip(&self, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.dir.path().join(name);
        let file = fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        for (entry, content) in entries {
            writer.start_file(*entry, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
        path
    }

    /// Raw state file contents.
    pub fn state_json(&self) -> serde_json::Value {
        let text = fs::read_to_string(self.state_path()).unwrap();
        serde_json::from_str(&text).unwrap()
    }
}
