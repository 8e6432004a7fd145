use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::HarvestError;

/// Environment variables consulted for the API token, in order.
const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_ACCESS_TOKEN", "GITHUB_TOKEN"];

/// Main configuration for a harvest session
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HarvestConfig {
    /// Repository owner (user or organization)
    pub owner: String,

    /// Repository name
    pub repo: String,

    /// Commits requested per listing page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Commit sha to stop at; the page containing it is still fully processed
    #[serde(default)]
    pub stop_sha: Option<String>,

    /// Dump per-commit patches and raw detail JSON to disk
    #[serde(default)]
    pub save_files: bool,

    /// Concurrent detail-fetch workers per page
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Cooldown between pages, in seconds (secondary rate limits)
    #[serde(default = "default_page_cooldown")]
    pub page_cooldown_secs: u64,

    /// API root, overridable for GitHub Enterprise or tests
    #[serde(default = "default_api_root")]
    pub api_root: String,

    /// Directory holding the progress file and side artifacts
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Bearer token; never serialized
    #[serde(skip)]
    pub token: String,
}

// Default value functions
fn default_per_page() -> u32 {
    100
}
fn default_workers() -> usize {
    5
}
fn default_page_cooldown() -> u64 {
    6
}
fn default_api_root() -> String {
    "https://api.github.com".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl HarvestConfig {
    /// Create a configuration for `owner/repo`, resolving the token from the
    /// explicit argument or the environment. A missing token is fatal.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self, HarvestError> {
        let token = resolve_token(token)?;

        Ok(Self {
            owner: owner.into(),
            repo: repo.into(),
            per_page: default_per_page(),
            stop_sha: None,
            save_files: false,
            workers: default_workers(),
            page_cooldown_secs: default_page_cooldown(),
            api_root: default_api_root(),
            data_dir: default_data_dir(),
            token,
        })
    }

    /// Listing endpoint URL for this repository
    pub fn commits_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/commits",
            self.api_root.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    /// Path of the per-repository progress file
    pub fn progress_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}_progress.json", self.owner, self.repo))
    }

    /// Root directory for per-commit side artifacts
    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}_commit_contents", self.owner, self.repo))
    }

    /// Path of the tabular export derived from the progress file
    pub fn export_path(&self) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}_progress.csv", self.owner, self.repo))
    }

    /// Inter-page cooldown as a [`Duration`]
    pub fn page_cooldown(&self) -> Duration {
        Duration::from_secs(self.page_cooldown_secs)
    }
}

/// Resolve the API token from the explicit argument or environment fallback
fn resolve_token(explicit: Option<String>) -> Result<String, HarvestError> {
    if let Some(token) = explicit {
        if !token.is_empty() {
            return Ok(token);
        }
    }

    for var in TOKEN_ENV_VARS {
        if let Ok(token) = env::var(var) {
            if !token.is_empty() {
                return Ok(token);
            }
        }
    }

    Err(HarvestError::Configuration(format!(
        "GitHub access token not provided and none of {} are set",
        TOKEN_ENV_VARS.join(", ")
    )))
}
