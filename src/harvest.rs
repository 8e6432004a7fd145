//! Harvest Engine - resumable, concurrent commit history harvesting
//!
//! This module drives the whole pipeline: a single control loop walks the
//! paginated listing endpoint, each page fans out to a bounded pool of
//! detail-fetch workers, and a single-writer assembler merges the completed
//! records into the progress store and checkpoints it before the next page
//! begins. Page N+1 never starts before page N's checkpoint is durably
//! written, so a crash loses at most one page of work.

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::artifacts::ArtifactSink;
use crate::config::HarvestConfig;
use crate::github::{CommitDetail, CommitSummary, GitHubClient};
use crate::progress::{CommitRecord, ProgressStore};

/// Results from a complete harvest run
#[derive(Debug, Clone)]
pub struct HarvestSummary {
    pub pages: u32,
    pub new_records: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_records: usize,
    pub duration: Duration,
}

/// Outcome of one page item after the detail-fetch worker finishes
enum ItemOutcome {
    /// New record, plus the detail payload when artifacts are enabled
    Harvested {
        record: CommitRecord,
        artifact: Option<(CommitDetail, Value)>,
    },
    /// Already present in the progress store
    Skipped,
    /// Detail fetch failed terminally; eligible for retry on a future run
    Failed,
}

/// The main harvest engine: pagination driver, concurrent detail fetcher,
/// and result assembler around one [`ProgressStore`].
pub struct HarvestEngine {
    config: Arc<HarvestConfig>,
    client: GitHubClient,
    store: Arc<ProgressStore>,
    artifacts: Option<ArtifactSink>,
}

impl HarvestEngine {
    /// Create an engine, loading any existing progress for this repository
    pub fn new(config: HarvestConfig) -> Result<Self> {
        let client = GitHubClient::new(&config).context("Failed to create GitHub client")?;
        let store = ProgressStore::load(config.progress_path())
            .context("Failed to load progress state")?;
        let artifacts = config.save_files.then(|| ArtifactSink::new(&config));

        Ok(Self {
            config: Arc::new(config),
            client,
            store: Arc::new(store),
            artifacts,
        })
    }

    /// Run the harvest to completion (or until the stop commit's page)
    pub async fn run(&self) -> Result<HarvestSummary> {
        let start = Instant::now();

        info!(
            owner = %self.config.owner,
            repo = %self.config.repo,
            resumed_records = self.store.len(),
            "starting commit harvest"
        );

        let mut pages = 0u32;
        let mut new_records = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        let mut page = 1u32;
        loop {
            // A listing failure aborts the harvest; everything checkpointed
            // on prior pages stays on disk and a re-run resumes from it.
            let summaries = self
                .client
                .list_commits(page)
                .await
                .with_context(|| format!("Failed to fetch commit listing page {}", page))?;

            if summaries.is_empty() {
                info!(page, "empty listing page, history exhausted");
                break;
            }

            let stop_found = match &self.config.stop_sha {
                Some(stop) => summaries.iter().any(|c| &c.sha == stop),
                None => false,
            };
            let page_len = summaries.len();

            // Fan out, then rejoin: every worker for this page completes
            // before the assembler touches the store.
            let outcomes = self.fetch_page_details(summaries).await;

            for outcome in outcomes {
                match outcome {
                    ItemOutcome::Harvested { record, artifact } => {
                        let sha = record.sha().to_string();
                        if self.store.record(record) {
                            new_records += 1;
                            info!(sha = %sha, "processed commit");
                            if let (Some(sink), Some((detail, raw))) =
                                (&self.artifacts, artifact.as_ref())
                            {
                                // Same-page duplicates were absorbed above;
                                // store length is now this record's sequence.
                                if let Err(e) =
                                    sink.save_commit(self.store.len(), detail, raw)
                                {
                                    warn!(sha = %sha, error = %e, "failed to save commit artifacts");
                                }
                            }
                        } else {
                            // Lost a same-page race; wasted fetch, not an error
                            skipped += 1;
                        }
                    }
                    ItemOutcome::Skipped => skipped += 1,
                    ItemOutcome::Failed => failed += 1,
                }
            }

            self.store
                .save()
                .context("Failed to checkpoint progress state")?;
            pages += 1;

            info!(
                page,
                items = page_len,
                total_records = self.store.len(),
                "page checkpointed"
            );

            if stop_found {
                info!(
                    stop_sha = self.config.stop_sha.as_deref().unwrap_or_default(),
                    page, "stop commit found, halting harvest"
                );
                break;
            }

            page += 1;

            // Fixed cooldown between pages keeps us under secondary limits
            tokio::time::sleep(self.config.page_cooldown()).await;
        }

        let summary = HarvestSummary {
            pages,
            new_records,
            skipped,
            failed,
            total_records: self.store.len(),
            duration: start.elapsed(),
        };

        info!(
            "Harvest finished in {:.2}s: {} new, {} skipped, {} failed across {} pages",
            summary.duration.as_secs_f64(),
            summary.new_records,
            summary.skipped,
            summary.failed,
            summary.pages
        );

        Ok(summary)
    }

    /// Fetch details for one page of summaries with a bounded worker pool.
    /// Completion order is arbitrary; the returned order decides append order.
    async fn fetch_page_details(&self, summaries: Vec<CommitSummary>) -> Vec<ItemOutcome> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.workers));
        let mut futures = FuturesUnordered::new();

        for summary in summaries {
            let semaphore = semaphore.clone();
            let client = self.client.clone();
            let store = self.store.clone();
            let want_artifact = self.artifacts.is_some();

            futures.push(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                // Workers see a view of the processed set frozen at the last
                // page barrier; a same-page duplicate slips through here and
                // is absorbed by the idempotent merge.
                if store.contains(&summary.sha) {
                    info!(sha = %summary.sha, "commit already processed, skipping");
                    return ItemOutcome::Skipped;
                }

                match client.commit_detail(&summary).await {
                    Ok((detail, raw)) => {
                        let record = CommitRecord::from_detail(&detail);
                        let artifact = want_artifact.then(|| (detail, raw));
                        ItemOutcome::Harvested { record, artifact }
                    }
                    Err(e) => {
                        error!(
                            sha = %summary.sha,
                            error = %e,
                            "failed to fetch commit detail, dropping item for this run"
                        );
                        ItemOutcome::Failed
                    }
                }
            });
        }

        let mut outcomes = Vec::with_capacity(futures.len());
        while let Some(outcome) = futures.next().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// The progress store backing this engine
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Configuration for external inspection
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }
}
