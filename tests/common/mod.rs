//! Common test utilities and helpers for RepoScribe tests

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reposcribe::HarvestConfig;

pub const OWNER: &str = "octocat";
pub const REPO: &str = "hello-world";

/// Harvest config pointed at a mock server, with the inter-page cooldown
/// zeroed so tests don't idle between pages.
pub fn test_config(server: &MockServer, data_dir: &std::path::Path) -> HarvestConfig {
    let mut config =
        HarvestConfig::new(OWNER, REPO, Some("test-token".to_string())).expect("config");
    config.api_root = server.uri();
    config.per_page = 2;
    config.page_cooldown_secs = 0;
    config.data_dir = data_dir.to_path_buf();
    config
}

/// Listing-endpoint summary entry for `sha`, with its detail URL routed back
/// to the mock server.
pub fn summary_json(server: &MockServer, sha: &str, author: &str, login: Option<&str>) -> Value {
    json!({
        "sha": sha,
        "url": format!("{}/repos/{}/{}/commits/{}", server.uri(), OWNER, REPO, sha),
        "html_url": format!("https://github.com/{}/{}/commit/{}", OWNER, REPO, sha),
        "commit": {
            "author": { "name": author, "date": "2024-05-01T12:00:00Z" },
            "message": format!("commit {}", sha)
        },
        "author": login.map(|l| json!({ "login": l })).unwrap_or(Value::Null)
    })
}

/// Detail-endpoint payload: the summary plus a changed-file list
pub fn detail_json(server: &MockServer, sha: &str, author: &str, login: Option<&str>) -> Value {
    let mut detail = summary_json(server, sha, author, login);
    detail["files"] = json!([
        { "filename": "src/main.rs", "patch": format!("@@ patch for {} @@", sha) }
    ]);
    detail
}

/// Mount one listing page returning `commits`
pub async fn mount_page(server: &MockServer, page: u32, commits: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits", OWNER, REPO)))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(commits))
        .mount(server)
        .await;
}

/// Mount the detail endpoint for `sha`
pub async fn mount_detail(server: &MockServer, sha: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/repos/{}/{}/commits/{}", OWNER, REPO, sha)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}
