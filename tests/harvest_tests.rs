//! End-to-end harvest tests against a mocked GitHub API
//!
//! These exercise the whole pipeline: pagination, concurrent detail fetches,
//! dedup against persisted progress, rate-limit waits, and checkpointing.

mod common;

use common::*;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reposcribe::progress::read_progress_file;
use reposcribe::{CommitRecord, HarvestEngine, ProgressStore};

#[tokio::test]
async fn test_full_harvest_across_two_pages() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        json!([
            summary_json(&server, "a1", "Grace", Some("gracehopper")),
            summary_json(&server, "b2", "Ada", None),
        ]),
    )
    .await;
    mount_page(
        &server,
        2,
        json!([summary_json(&server, "c3", "Edsger", Some("ewd"))]),
    )
    .await;
    mount_page(&server, 3, json!([])).await;

    mount_detail(&server, "a1", detail_json(&server, "a1", "Grace", Some("gracehopper"))).await;
    mount_detail(&server, "b2", detail_json(&server, "b2", "Ada", None)).await;
    mount_detail(&server, "c3", detail_json(&server, "c3", "Edsger", Some("ewd"))).await;

    let engine = HarvestEngine::new(test_config(&server, dir.path())).unwrap();
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.new_records, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.total_records, 3);
    assert_eq!(summary.pages, 2);

    // Checkpoint survives on disk with the invariant intact
    let state = read_progress_file(engine.store().path()).unwrap();
    assert_eq!(state.commits_info.len(), 3);
    assert_eq!(state.processed_commits.len(), 3);
    for record in &state.commits_info {
        assert!(state.processed_commits.contains(record.sha()));
    }

    // Author without a linked account gets the sentinel URL
    let ada = state
        .commits_info
        .iter()
        .find(|r| r.sha() == "b2")
        .unwrap();
    assert_eq!(ada.author_url, "N/A");
}

#[tokio::test]
async fn test_resume_skips_already_processed_commit() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    let config = test_config(&server, dir.path());

    // Seed the progress file as a previous run would have left it: commit b2
    // already harvested.
    let seeded = CommitRecord {
        commit_url: format!("https://github.com/{}/{}/commit/b2", OWNER, REPO),
        author_name: "Ada (from earlier run)".to_string(),
        author_url: "N/A".to_string(),
        commit_date: "2024-04-01T00:00:00Z".to_string(),
        commit_message: "seeded".to_string(),
    };
    let store = ProgressStore::load(config.progress_path()).unwrap();
    store.record(seeded.clone());
    store.save().unwrap();
    drop(store);

    mount_page(
        &server,
        1,
        json!([
            summary_json(&server, "a1", "Grace", Some("gracehopper")),
            summary_json(&server, "b2", "Ada", None),
        ]),
    )
    .await;
    mount_page(
        &server,
        2,
        json!([summary_json(&server, "c3", "Edsger", Some("ewd"))]),
    )
    .await;
    mount_page(&server, 3, json!([])).await;

    mount_detail(&server, "a1", detail_json(&server, "a1", "Grace", Some("gracehopper"))).await;
    mount_detail(&server, "c3", detail_json(&server, "c3", "Edsger", Some("ewd"))).await;

    // The already-processed commit must never be fetched again
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits/b2", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let engine = HarvestEngine::new(config).unwrap();
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.new_records, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.total_records, 3);

    // The seeded record is untouched, not overwritten by a re-fetch
    let state = read_progress_file(engine.store().path()).unwrap();
    let b2 = state.commits_info.iter().find(|r| r.sha() == "b2").unwrap();
    assert_eq!(*b2, seeded);
}

#[tokio::test]
async fn test_stop_sha_processes_its_page_then_halts() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        json!([
            summary_json(&server, "a1", "Grace", Some("gracehopper")),
            summary_json(&server, "b2", "Ada", None),
        ]),
    )
    .await;
    mount_detail(&server, "a1", detail_json(&server, "a1", "Grace", Some("gracehopper"))).await;
    mount_detail(&server, "b2", detail_json(&server, "b2", "Ada", None)).await;

    // Page 2 must never be requested once the stop sha showed up on page 1
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits", OWNER, REPO)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = test_config(&server, dir.path());
    // a1 is not the last item on the page; the whole page is still processed
    config.stop_sha = Some("a1".to_string());

    let engine = HarvestEngine::new(config).unwrap();
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.new_records, 2);
    assert_eq!(summary.total_records, 2);
}

#[tokio::test]
async fn test_rate_limited_request_waits_and_is_reissued() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        json!([summary_json(&server, "a1", "Grace", Some("gracehopper"))]),
    )
    .await;
    mount_page(&server, 2, json!([])).await;

    // First detail attempt: quota exhausted, reset already due. The governor
    // must re-issue the same logical request, which then succeeds.
    let reset = chrono::Utc::now().timestamp();
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits/a1", OWNER, REPO)))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .insert_header("x-ratelimit-reset", reset.to_string().as_str()),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_detail(&server, "a1", detail_json(&server, "a1", "Grace", Some("gracehopper"))).await;

    let engine = HarvestEngine::new(test_config(&server, dir.path())).unwrap();
    let summary = engine.run().await.unwrap();

    // The original caller got its data after the governed retry
    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.failed, 0);
    assert!(engine.store().contains("a1"));
}

#[tokio::test]
async fn test_persistent_503_fails_only_that_item() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        json!([
            summary_json(&server, "a1", "Grace", Some("gracehopper")),
            summary_json(&server, "b2", "Ada", None),
        ]),
    )
    .await;
    mount_page(&server, 2, json!([])).await;

    // a1's detail endpoint is down for good: 5 attempts, then give up
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits/a1", OWNER, REPO)))
        .respond_with(ResponseTemplate::new(503))
        .expect(5)
        .mount(&server)
        .await;
    mount_detail(&server, "b2", detail_json(&server, "b2", "Ada", None)).await;

    let engine = HarvestEngine::new(test_config(&server, dir.path())).unwrap();
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.failed, 1);
    assert!(engine.store().contains("b2"));
    // The failed item was never marked processed, so a future run retries it
    assert!(!engine.store().contains("a1"));
}

#[tokio::test]
async fn test_listing_failure_preserves_prior_checkpoints() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        json!([
            summary_json(&server, "a1", "Grace", Some("gracehopper")),
            summary_json(&server, "b2", "Ada", None),
        ]),
    )
    .await;
    mount_detail(&server, "a1", detail_json(&server, "a1", "Grace", Some("gracehopper"))).await;
    mount_detail(&server, "b2", detail_json(&server, "b2", "Ada", None)).await;

    // Page 2 listing is gone for good (non-retryable)
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits", OWNER, REPO)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let config = test_config(&server, dir.path());
    let progress_path = config.progress_path();

    let engine = HarvestEngine::new(config).unwrap();
    let result = engine.run().await;
    assert!(result.is_err());

    // Page 1's checkpoint is on disk; a re-run resumes instead of restarting
    let state = read_progress_file(&progress_path).unwrap();
    assert_eq!(state.commits_info.len(), 2);
    assert_eq!(state.processed_commits.len(), 2);
}

#[tokio::test]
async fn test_interrupted_run_resumes_to_full_history() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        json!([
            summary_json(&server, "a1", "Grace", Some("gracehopper")),
            summary_json(&server, "b2", "Ada", None),
        ]),
    )
    .await;
    mount_page(
        &server,
        2,
        json!([summary_json(&server, "c3", "Edsger", Some("ewd"))]),
    )
    .await;
    mount_page(&server, 3, json!([])).await;

    mount_detail(&server, "a1", detail_json(&server, "a1", "Grace", Some("gracehopper"))).await;
    mount_detail(&server, "b2", detail_json(&server, "b2", "Ada", None)).await;
    mount_detail(&server, "c3", detail_json(&server, "c3", "Edsger", Some("ewd"))).await;

    // First run "crashes" after page 1: the stop sha halts it right there
    let mut first_config = test_config(&server, dir.path());
    first_config.stop_sha = Some("b2".to_string());
    let first = HarvestEngine::new(first_config).unwrap();
    let first_summary = first.run().await.unwrap();
    assert_eq!(first_summary.total_records, 2);
    drop(first);

    // Second run resumes from the checkpoint and completes the history
    let engine = HarvestEngine::new(test_config(&server, dir.path())).unwrap();
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.new_records, 1);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.total_records, 3);

    // Exactly N unique identifiers, no duplicate records
    let state = read_progress_file(engine.store().path()).unwrap();
    assert_eq!(state.commits_info.len(), 3);
    assert_eq!(state.processed_commits.len(), 3);
    let mut shas: Vec<_> = state.commits_info.iter().map(|r| r.sha()).collect();
    shas.sort_unstable();
    shas.dedup();
    assert_eq!(shas.len(), 3);
}

#[tokio::test]
async fn test_save_files_writes_artifacts() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    mount_page(
        &server,
        1,
        json!([summary_json(&server, "a1", "Grace", Some("gracehopper"))]),
    )
    .await;
    mount_page(&server, 2, json!([])).await;
    mount_detail(&server, "a1", detail_json(&server, "a1", "Grace", Some("gracehopper"))).await;

    let mut config = test_config(&server, dir.path());
    config.save_files = true;
    let artifacts_dir = config.artifacts_dir();

    let engine = HarvestEngine::new(config).unwrap();
    engine.run().await.unwrap();

    let commit_dir = artifacts_dir.join(format!("{}_{}_1-a1", OWNER, REPO));
    let patch = std::fs::read_to_string(commit_dir.join("src_main.rs")).unwrap();
    assert_eq!(patch, "@@ patch for a1 @@");

    let info: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(commit_dir.join("commit_info.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(info["sha"], "a1");
    assert_eq!(info["files"][0]["filename"], "src/main.rs");
}
