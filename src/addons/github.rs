//! GitHub API client for the official add-on listing.

use super::types::AddonError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default GitHub API root.
pub const DEFAULT_API_ROOT: &str = "https://api.github.com";

/// Organization hosting the official add-ons.
pub const DEFAULT_OFFICIAL_ORG: &str = "benchbot-addons";

/// Maximum repositories requested per page (GitHub's upper bound).
const PER_PAGE: usize = 100;

/// Safety bound on pagination.
const MAX_PAGES: usize = 20;

/// Repository entry from `GET /orgs/{org}/repos`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    /// `owner/name`.
    pub full_name: String,
}

/// Source of the official add-on listing.
pub trait AddonListing {
    /// Browser URL of the organization.
    fn org_url(&self) -> String;

    /// Full names of every official add-on.
    fn official_addons(&self) -> Result<Vec<String>, AddonError>;
}

/// Lists repositories of the official organization.
pub struct OfficialClient {
    /// HTTP client.
    client: reqwest::blocking::Client,
    /// API root, without trailing slash.
    api_root: String,
    /// Organization name.
    org: String,
}

impl OfficialClient {
    /// Creates a client for `org` against `api_root`.
    #[must_use]
    pub fn new(api_root: &str, org: &str) -> Self {
        assert!(!org.is_empty(), "Organization must not be empty");

        let client = reqwest::blocking::Client::builder()
            .user_agent("addon-manager")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            client,
            api_root: api_root.trim_end_matches('/').to_string(),
            org: org.to_string(),
        }
    }

    /// Fetches every repository entry, following pagination.
    pub fn fetch_repos(&self) -> Result<Vec<GitHubRepo>, AddonError> {
        info!("[ADDON-GITHUB] Listing repositories of '{}'", self.org);
        let start = Instant::now();

        let mut repos = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch = self.fetch_page(page)?;
            let done = batch.len() < PER_PAGE;
            repos.extend(batch);
            if done {
                break;
            }
        }

        info!(
            "[ADDON-GITHUB] Found {} repositories in {:?}",
            repos.len(),
            start.elapsed()
        );
        Ok(repos)
    }

    fn fetch_page(&self, page: usize) -> Result<Vec<GitHubRepo>, AddonError> {
        let url = format!(
            "{}/orgs/{}/repos?per_page={}&page={}",
            self.api_root, self.org, PER_PAGE, page
        );
        debug!("[ADDON-GITHUB] GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .map_err(|e| {
                warn!("[ADDON-GITHUB] HTTP request failed: {}", e);
                AddonError::Network(e.to_string())
            })?;

        let status = response.status();
        debug!("[ADDON-GITHUB] Response: {}", status);

        if status == reqwest::StatusCode::NOT_FOUND {
            warn!("[ADDON-GITHUB] Organization not found: {}", self.org);
            return Err(AddonError::Network(format!(
                "organization '{}' not found",
                self.org
            )));
        }

        if status == reqwest::StatusCode::FORBIDDEN && is_rate_limited(response.headers()) {
            warn!("[ADDON-GITHUB] GitHub rate limit exceeded!");
            return Err(AddonError::RateLimitExceeded);
        }

        if !status.is_success() {
            return Err(AddonError::Network(format!("GitHub API error: {}", status)));
        }

        response
            .json::<Vec<GitHubRepo>>()
            .map_err(|e| AddonError::Network(format!("Failed to parse response: {}", e)))
    }
}

impl AddonListing for OfficialClient {
    fn org_url(&self) -> String {
        format!("https://github.com/{}", self.org)
    }

    fn official_addons(&self) -> Result<Vec<String>, AddonError> {
        Ok(self
            .fetch_repos()?
            .into_iter()
            .map(|r| r.full_name)
            .collect())
    }
}

/// Returns true if the response reports an exhausted rate limit.
fn is_rate_limited(headers: &reqwest::header::HeaderMap) -> bool {
    headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "0")
}
