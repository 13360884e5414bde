//! Resource queries over installed add-ons.
//!
//! A resource of type `T` is any `*.yaml`/`*.yml` file sitting directly in a
//! directory named `T`, anywhere below the install root.

use super::types::{AddonError, ResourceType};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Returns canonical paths of every resource file of `resource_type`, sorted.
pub fn find_all(root: &Path, resource_type: &str) -> Result<Vec<PathBuf>, AddonError> {
    let resource_type = ResourceType::parse(resource_type)?;
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() || !is_resource(entry.path(), resource_type) {
            continue;
        }
        let path = fs::canonicalize(entry.path()).unwrap_or_else(|_| entry.path().to_path_buf());
        found.push(path);
    }

    found.sort();
    found.dedup();
    debug!(
        "[ADDON-RESOURCES] Found {} {} file(s) under {}",
        found.len(),
        resource_type,
        root.display()
    );
    Ok(found)
}

/// Returns `field` from every resource file of `resource_type`.
///
/// Files without the field are skipped.
pub fn get_field(root: &Path, resource_type: &str, field: &str) -> Result<Vec<Value>, AddonError> {
    let mut values = Vec::new();
    for path in find_all(root, resource_type)? {
        let content = fs::read_to_string(&path)?;
        let doc: Value = serde_yaml::from_str(&content).map_err(|source| AddonError::Yaml {
            path: path.clone(),
            source,
        })?;
        match doc.get(field) {
            Some(value) => values.push(value.clone()),
            None => debug!("[ADDON-RESOURCES] {} has no '{}'", path.display(), field),
        }
    }
    Ok(values)
}

fn is_resource(path: &Path, resource_type: ResourceType) -> bool {
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e == "yaml" || e == "yml");
    let parent_matches = path
        .parent()
        .and_then(|p| p.file_name())
        .is_some_and(|n| n == resource_type.dir_name());
    is_yaml && parent_matches
}
