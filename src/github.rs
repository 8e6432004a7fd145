//! GitHub API client for the commits resource
//!
//! Thin wrapper over the [`Transport`] layer that owns the auth header and
//! routes every response through the [`RateLimitGovernor`]. Only the two
//! endpoints the harvest needs are exposed: the paginated commit listing and
//! the per-commit detail URL.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::ratelimit::RateLimitGovernor;
use crate::transport::Transport;

/// Author slot of a commit's git metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitAuthor {
    pub name: String,
    pub date: String,
}

/// Git-level commit metadata embedded in both listing and detail responses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitCommit {
    pub author: GitAuthor,
    pub message: String,
}

/// GitHub account linked to a commit, when the API can resolve one
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountRef {
    pub login: String,
}

/// One entry from the paginated listing endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommitSummary {
    pub sha: String,
    /// API URL of the full detail for this commit
    pub url: String,
    pub html_url: String,
    pub commit: GitCommit,
    pub author: Option<AccountRef>,
}

/// One changed file within a commit detail
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChangedFile {
    pub filename: String,
    /// Absent for binary files and very large diffs
    pub patch: Option<String>,
}

/// Full detail response for one commit: superset of [`CommitSummary`]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommitDetail {
    pub sha: String,
    pub html_url: String,
    pub commit: GitCommit,
    pub author: Option<AccountRef>,
    #[serde(default)]
    pub files: Vec<ChangedFile>,
}

/// GitHub client scoped to one repository's commits
#[derive(Clone)]
pub struct GitHubClient {
    transport: Transport,
    governor: RateLimitGovernor,
    headers: HeaderMap,
    commits_url: String,
    per_page: u32,
}

impl GitHubClient {
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("token {}", config.token)).map_err(|_| {
            HarvestError::Configuration("access token contains invalid header characters".into())
        })?;
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            transport: Transport::new()?,
            governor: RateLimitGovernor::new(),
            headers,
            commits_url: config.commits_url(),
            per_page: config.per_page,
        })
    }

    /// Fetch one page of the commit listing. An empty vector means the
    /// repository's history is exhausted.
    pub async fn list_commits(&self, page: u32) -> Result<Vec<CommitSummary>, HarvestError> {
        debug!(page, "fetching commit listing page");
        let query = [
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ];
        let body = self.get_json(&self.commits_url, &query).await?;
        serde_json::from_value(body).map_err(|e| {
            HarvestError::Api(format!("malformed commit listing on page {}: {}", page, e))
        })
    }

    /// Fetch the full detail for one commit, returning both the typed view
    /// and the raw JSON body (the artifact sink persists the raw form).
    pub async fn commit_detail(
        &self,
        summary: &CommitSummary,
    ) -> Result<(CommitDetail, Value), HarvestError> {
        debug!(sha = %summary.sha, "fetching commit detail");
        let body = self.get_json(&summary.url, &[]).await?;
        let detail: CommitDetail = serde_json::from_value(body.clone()).map_err(|e| {
            HarvestError::Api(format!("malformed detail for commit {}: {}", summary.sha, e))
        })?;
        Ok((detail, body))
    }

    /// GET a JSON body, re-issuing the request whenever the governor slept
    /// through a quota reset.
    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, HarvestError> {
        loop {
            let response = self.transport.get(url, &self.headers, query).await?;
            let status = response.status();

            if self.governor.observe(status, response.headers()).await {
                continue;
            }

            if !status.is_success() {
                return Err(HarvestError::transport(
                    Some(status.as_u16()),
                    1,
                    format!("GET {} returned {}", url, status),
                ));
            }

            return response
                .json()
                .await
                .map_err(|e| HarvestError::Api(format!("invalid JSON from {}: {}", url, e)));
        }
    }
}
