//! RepoScribe - Resumable GitHub Commit History Harvester
//!
//! RepoScribe walks a repository's full commit history through the paginated
//! GitHub REST API, fetching per-commit detail concurrently while staying
//! inside the API's rate limits, and checkpoints progress after every page so
//! an interrupted harvest resumes instead of restarting.
//!
//! ## Core Features
//!
//! - **Resumable**: durable per-repository progress file, checkpointed page by page
//! - **Concurrent**: bounded worker pool for detail fetches within each page
//! - **Rate-limit aware**: quota headers inspected on every response, with a
//!   governed wait on exhaustion
//! - **Retry with backoff**: transient server failures retried at the transport
//! - **Optional artifacts**: per-commit patch dumps and CSV export of the result
//!
//! ## Modules
//!
//! - [`config`]: Harvest session configuration and token resolution
//! - [`harvest`]: Pagination driving, concurrent fetch, and checkpointing

pub mod artifacts;
pub mod config;
pub mod error;
pub mod export;
pub mod github;
pub mod harvest;
pub mod progress;
pub mod ratelimit;
pub mod transport;

pub use config::HarvestConfig;
pub use error::HarvestError;
pub use github::GitHubClient;
pub use harvest::{HarvestEngine, HarvestSummary};
pub use progress::{CommitRecord, ProgressState, ProgressStore};
