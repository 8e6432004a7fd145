//! Side artifact sink for the save-files option
//!
//! When enabled, every processed commit gets its own directory under
//! `{owner}_{repo}_commit_contents/` holding each changed file's patch text
//! plus the raw detail JSON. This is an external sink: failures here are
//! logged and never fail the item, and none of the harvest's correctness
//! depends on what lands in it.

use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::github::CommitDetail;

/// Writes per-commit patch files and raw detail JSON
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    root: PathBuf,
    owner: String,
    repo: String,
}

impl ArtifactSink {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            root: config.artifacts_dir(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
        }
    }

    /// Persist one commit's patches and raw JSON. `sequence` is the 1-based
    /// position of this commit among all records harvested so far; it only
    /// names the directory.
    pub fn save_commit(
        &self,
        sequence: usize,
        detail: &CommitDetail,
        raw: &Value,
    ) -> Result<(), HarvestError> {
        let dir = self.root.join(format!(
            "{}_{}_{}-{}",
            self.owner, self.repo, sequence, detail.sha
        ));
        fs::create_dir_all(&dir)?;

        for file in &detail.files {
            let patch = file.patch.as_deref().unwrap_or("");
            // Flatten the repo path into a single file name
            let name = file.filename.replace('/', "_");
            fs::write(dir.join(name), patch)?;
        }

        let info = serde_json::to_string_pretty(raw).map_err(|e| {
            HarvestError::Persistence(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        fs::write(dir.join("commit_info.json"), info)?;

        debug!(sha = %detail.sha, dir = %dir.display(), "saved commit artifacts");
        Ok(())
    }
}
