//! Progress Store - durable, resumable harvest state
//!
//! One JSON file per (owner, repository) pair holds the accumulated records
//! and the set of processed commit shas. The file format matches what earlier
//! harvests wrote, so a resume never needs a migration. Saves go through a
//! sibling temp file and an atomic rename: a crash mid-write can never leave
//! a truncated file for the next load.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

use crate::error::HarvestError;
use crate::github::CommitDetail;

/// Sentinel author profile URL when the API cannot resolve an account
pub const UNKNOWN_AUTHOR_URL: &str = "N/A";

/// The stable output unit: one commit reduced to the fields the harvest keeps.
/// Immutable once created; produced exactly once per unique sha.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CommitRecord {
    #[serde(rename = "Commit URL")]
    pub commit_url: String,
    #[serde(rename = "Author Name")]
    pub author_name: String,
    #[serde(rename = "Author URL")]
    pub author_url: String,
    #[serde(rename = "Commit Date")]
    pub commit_date: String,
    #[serde(rename = "Commit Message")]
    pub commit_message: String,
}

impl CommitRecord {
    /// Reduce a full commit detail to its normalized form
    pub fn from_detail(detail: &CommitDetail) -> Self {
        let author_url = detail
            .author
            .as_ref()
            .map(|account| format!("https://github.com/{}", account.login))
            .unwrap_or_else(|| UNKNOWN_AUTHOR_URL.to_string());

        Self {
            commit_url: detail.html_url.clone(),
            author_name: detail.commit.author.name.clone(),
            author_url,
            commit_date: detail.commit.author.date.clone(),
            commit_message: detail.commit.message.clone(),
        }
    }

    /// The commit sha, recovered from the canonical URL's last segment
    pub fn sha(&self) -> &str {
        self.commit_url
            .rsplit('/')
            .next()
            .unwrap_or(&self.commit_url)
    }
}

/// In-memory harvest state. Records are append-only in completion order;
/// every sha in `processed_commits` has exactly one record and vice versa.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProgressState {
    #[serde(default)]
    pub commits_info: Vec<CommitRecord>,
    #[serde(default)]
    pub processed_commits: HashSet<String>,
}

impl ProgressState {
    pub fn len(&self) -> usize {
        self.commits_info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits_info.is_empty()
    }
}

/// Durable store for [`ProgressState`], exclusively owned by one harvest
/// session. Workers issue concurrent `contains` reads; `record` and `save`
/// are called only by the single-writer assembler.
pub struct ProgressStore {
    path: PathBuf,
    state: RwLock<ProgressState>,
}

impl ProgressStore {
    /// Load existing progress from `path`, or start empty when absent
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, HarvestError> {
        let path = path.into();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let state: ProgressState = serde_json::from_str(&raw).map_err(|e| {
                HarvestError::Persistence(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("corrupt progress file {}: {}", path.display(), e),
                ))
            })?;
            info!(
                path = %path.display(),
                records = state.len(),
                "resuming from existing progress file"
            );
            state
        } else {
            debug!(path = %path.display(), "no progress file, starting fresh");
            ProgressState::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Whether `sha` has already been processed and recorded
    pub fn contains(&self, sha: &str) -> bool {
        self.state
            .read()
            .expect("progress lock poisoned")
            .processed_commits
            .contains(sha)
    }

    /// Append a record and mark its sha processed. Idempotent: a duplicate
    /// sha is a no-op, and the return value reports whether anything changed.
    pub fn record(&self, record: CommitRecord) -> bool {
        let mut state = self.state.write().expect("progress lock poisoned");
        if !state.processed_commits.insert(record.sha().to_string()) {
            return false;
        }
        state.commits_info.push(record);
        true
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.state.read().expect("progress lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current state
    pub fn snapshot(&self) -> ProgressState {
        self.state.read().expect("progress lock poisoned").clone()
    }

    /// Durably checkpoint the current state. Writes a sibling temp file and
    /// renames it over the target so a crash never exposes a partial file.
    pub fn save(&self) -> Result<(), HarvestError> {
        let state = self.state.read().expect("progress lock poisoned");
        let body = serde_json::to_vec(&*state).map_err(|e| {
            HarvestError::Persistence(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &body)?;
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            records = state.len(),
            "checkpoint written"
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a persisted progress file without opening a store around it
pub fn read_progress_file(path: &Path) -> Result<ProgressState, HarvestError> {
    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        HarvestError::Persistence(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("corrupt progress file {}: {}", path.display(), e),
        ))
    })
}
