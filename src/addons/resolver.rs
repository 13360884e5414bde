//! Add-on name resolution.
//!
//! Accepts either `owner/repo` or a full repository URL. The owner and repo
//! are always the last two `/`-separated segments of the URL. This is a
//! best-effort split: nothing checks that the segments are non-empty.

use super::types::AddonRef;

/// Host used to expand `owner/repo` shorthands.
pub const DEFAULT_HOST: &str = "https://github.com";

/// Resolves a user-supplied reference into an [`AddonRef`].
#[must_use]
pub fn parse_name(name: &str) -> AddonRef {
    let name = name.trim();
    let url = if name.starts_with("http") {
        name.to_string()
    } else {
        format!("{}/{}", DEFAULT_HOST, name.trim_start_matches('/'))
    };

    let path = url.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let mut segments = path.rsplitn(3, '/');
    let repo = segments.next().unwrap_or_default().to_string();
    let owner = segments.next().unwrap_or_default().to_string();

    AddonRef { url, owner, repo }
}

/// Splits a comma-separated list, dropping empty entries.
#[must_use]
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
