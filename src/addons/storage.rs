//! Installed-state persistence.
//!
//! The whole state is a single JSON object mapping canonical add-on names to
//! their [`AddonRecord`]. Every mutation reads the file fully and rewrites it
//! fully. There is no locking: two concurrent invocations against the same
//! file can lose an update.

use super::types::{AddonRecord, InstalledState};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Maximum accepted state file size (4 MB).
const MAX_FILE_SIZE: u64 = 4 * 1024 * 1024;

/// State storage errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialize(#[source] serde_json::Error),

    /// File too large.
    #[error("File too large (max {MAX_FILE_SIZE} bytes)")]
    FileTooLarge,
}

/// Reads and writes the installed-state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    /// Path to the JSON state file.
    path: PathBuf,
}

impl StateStore {
    /// Creates a store backed by the given file.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        assert!(!path.as_os_str().is_empty(), "path must not be empty");
        Self { path }
    }

    /// Returns the state file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the installed state.
    ///
    /// A missing file is an empty state, not an error.
    pub fn load(&self) -> Result<InstalledState, StateError> {
        if !self.path.exists() {
            debug!("[ADDON-STATE] No state file at {}", self.path.display());
            return Ok(InstalledState::new());
        }

        let metadata = fs::metadata(&self.path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(StateError::FileTooLarge);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(InstalledState::new());
        }

        serde_json::from_str(&content).map_err(StateError::Parse)
    }

    /// Writes the full state, replacing the previous file.
    pub fn save(&self, state: &InstalledState) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = to_pretty_json(state)?;

        // Write to a sibling temp file, then rename over the original
        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&content)?;
            file.write_all(b"\n")?;
            file.flush()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(
            "[ADDON-STATE] Wrote {} record(s) to {}",
            state.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Returns the record for one add-on, if installed.
    pub fn get(&self, name: &str) -> Result<Option<AddonRecord>, StateError> {
        Ok(self.load()?.remove(name))
    }

    /// Applies `f` to the record for `name` (created if absent) and persists.
    pub fn update<F>(&self, name: &str, f: F) -> Result<(), StateError>
    where
        F: FnOnce(&mut AddonRecord),
    {
        let mut state = self.load()?;
        f(state.entry(name.to_string()).or_default());
        self.save(&state)
    }

    /// Deletes the record for `name` and persists. Returns whether it existed.
    pub fn remove(&self, name: &str) -> Result<bool, StateError> {
        let mut state = self.load()?;
        let existed = state.remove(name).is_some();
        self.save(&state)?;
        Ok(existed)
    }
}

/// Serializes with four-space indentation.
fn to_pretty_json(state: &InstalledState) -> Result<Vec<u8>, StateError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    state.serialize(&mut ser).map_err(StateError::Serialize)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> StateStore {
        StateStore::new(dir.path().join(".state"))
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_load_empty_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "  \n").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut state = InstalledState::new();
        state.insert(
            "acme/sensors".to_string(),
            AddonRecord {
                hash: "0123456789abcdef".to_string(),
                deps: vec!["acme/drivers".to_string()],
                remote: Some("https://example.com/data.zip".to_string()),
                remote_target: Some("data".to_string()),
            },
        );
        store.save(&state).unwrap();

        assert_eq!(store.load().unwrap(), state);
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_save_uses_four_space_indent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .update("acme/drivers", |r| r.hash = "abc".to_string())
            .unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\n    \"acme/drivers\": {"));
        assert!(content.contains("\n        \"hash\": \"abc\""));
        assert!(!content.contains("remote"));
    }

    #[test]
    fn test_reads_snake_case_remote_target() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"{"acme/maps": {"hash": "ff", "deps": [], "remote": "u", "remote_target": "t"}}"#,
        )
        .unwrap();

        let record = store.get("acme/maps").unwrap().unwrap();
        assert!(record.remote_matches("u", "t"));
    }

    #[test]
    fn test_update_creates_and_modifies() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .update("acme/a", |r| r.hash = "one".to_string())
            .unwrap();
        store
            .update("acme/a", |r| r.deps.push("acme/b".to_string()))
            .unwrap();

        let record = store.get("acme/a").unwrap().unwrap();
        assert_eq!(record.hash, "one");
        assert_eq!(record.deps, vec!["acme/b".to_string()]);
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.update("acme/a", |_| {}).unwrap();
        store.update("acme/b", |_| {}).unwrap();

        assert!(store.remove("acme/a").unwrap());
        assert!(!store.remove("acme/a").unwrap());

        let state = store.load().unwrap();
        assert_eq!(state.keys().collect::<Vec<_>>(), vec!["acme/b"]);
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load(), Err(StateError::Parse(_))));
    }
}
