use mockito::{Matcher, Server, ServerGuard};
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const TREE: &str = r#"{
  "id": 100, "type": "story", "author": "op", "title": "Show HN: A thing",
  "children": [
    {"id": 11, "type": "comment", "author": "alice", "children": [
      {"id": 12, "type": "comment", "author": "bob", "children": []}
    ]},
    {"id": 13, "type": "comment", "author": "carol", "children": []},
    {"id": 14, "type": "comment", "author": "dave", "children": []}
  ]
}"#;

fn row(id: u64, class: &str, text: &str) -> String {
    format!(
        r#"<tr class="athing comtr" id="{id}"><td><div class="comment"><div class="commtext {class}">{text}</div></div></td></tr>"#
    )
}

fn page() -> String {
    let body = [
        row(11, "c00", "This is great. I tried it yesterday. It worked well."),
        row(12, "c00", "Did you try the flags? They matter. Docs explain it."),
        row(13, "c00", "Pricing seems off. Compare with others. Still fine."),
        row(14, "cae", "Not impressed. Seen it before. Moving on."),
    ]
    .join("\n");
    format!("<html><body><table>{body}</table></body></html>")
}

fn mock_thread(server: &mut ServerGuard) {
    server.mock("GET", "/items/100").with_body(TREE).create();
    server
        .mock("GET", "/item")
        .match_query(Matcher::UrlEncoded("id".into(), "100".into()))
        .with_body(page())
        .create();
}

fn write_settings(home: &Path, server_url: &str) {
    let settings = format!(
        "server_cache_enabled = true\nprovider_selection = \"openai\"\nprompt_customization = false\n\n[providers.openai]\napi_key = \"sk-test\"\nmodel = \"gpt-4o-mini\"\nbase_url = \"{server_url}\"\n"
    );
    fs::write(home.join("settings.toml"), settings).expect("write settings");
}

fn digest_cmd(home: &Path, server_url: &str) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("thread-digest");
    cmd.current_dir(home)
        .env("THREAD_DIGEST_HOME", home)
        .env("THREAD_DIGEST_API_BASE", server_url)
        .env("THREAD_DIGEST_SITE_BASE", server_url)
        .env("THREAD_DIGEST_CACHE_BASE", server_url)
        .env("THREAD_DIGEST_USER_API_BASE", server_url)
        .env_remove("THREAD_DIGEST_SETTINGS_FILE")
        .env_remove("THREAD_DIGEST_PROVIDER")
        .env_remove("THREAD_DIGEST_MODEL")
        .env_remove("THREAD_DIGEST_SERVER_CACHE");
    cmd
}

#[test]
fn format_prints_path_addressed_lines() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    mock_thread(&mut server);

    digest_cmd(tmp.path(), &server.url())
        .args(["format", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "[1] (score: 1000) <replies: 1> {downvotes: 0} alice: This is great.",
        ))
        .stdout(predicate::str::contains("[1.1] (score: 750) <replies: 0> {downvotes: 0} bob:"))
        .stdout(predicate::str::contains("[3] (score: 100) <replies: 0> {downvotes: 6} dave:"));
}

#[test]
fn summarize_qualifies_references_to_comment_urls() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    mock_thread(&mut server);
    server.mock("GET", "/summaries/100").with_status(404).create();
    let provider = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::Regex("Show HN: A thing".to_string()))
        .with_body(
            json!({"choices": [{"message": {"content": "Fans like it [1] (alice), see [1.1] and [9]."}}]})
                .to_string(),
        )
        .expect(1)
        .create();
    write_settings(tmp.path(), &server.url());

    let comment_url = format!("{}/item?id=100#11", server.url());
    digest_cmd(tmp.path(), &server.url())
        .args(["summarize", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("[1]({comment_url}) (alice)")))
        .stdout(predicate::str::contains("item?id=100#12"))
        .stdout(predicate::str::contains("[9]."));
    provider.assert();
}

#[test]
fn summarize_html_emits_navigation_markers() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    mock_thread(&mut server);
    server.mock("GET", "/summaries/100").with_status(404).create();
    server
        .mock("POST", "/v1/chat/completions")
        .with_body(
            json!({"choices": [{"message": {"content": "**Theme** from [2] (carol)."}}]})
                .to_string(),
        )
        .create();
    write_settings(tmp.path(), &server.url());

    digest_cmd(tmp.path(), &server.url())
        .args(["summarize", "100", "--html"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<strong>Theme</strong>"))
        .stdout(predicate::str::contains("data-comment-id=\"13\""));
}

#[test]
fn cached_summary_is_used_without_calling_the_provider() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    mock_thread(&mut server);
    server
        .mock("GET", "/summaries/100")
        .with_body(r#"{"summary": "Cached take on [3] (dave).", "created_at": "2024-05-01T10:00:00Z"}"#)
        .create();
    let provider = server.mock("POST", "/v1/chat/completions").expect(0).create();
    write_settings(tmp.path(), &server.url());

    digest_cmd(tmp.path(), &server.url())
        .args(["summarize", "100"])
        .assert()
        .success()
        .stderr(predicate::str::contains("source=cache"))
        .stdout(predicate::str::contains("item?id=100#14"));
    provider.assert();
}

#[test]
fn missing_api_key_is_reported_as_configuration_issue() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    mock_thread(&mut server);
    let provider = server.mock("POST", "/v1/chat/completions").expect(0).create();

    digest_cmd(tmp.path(), &server.url())
        .env_remove("OPENAI_API_KEY")
        .args(["summarize", "100", "--no-cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing_configuration"));
    provider.assert();
}

#[test]
fn links_rewrites_saved_summary() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    mock_thread(&mut server);
    let saved = tmp.path().join("summary.md");
    fs::write(
        &saved,
        "Critics: [3] (dave). Already linked: [2](https://elsewhere.test).",
    )
    .expect("write summary");

    digest_cmd(tmp.path(), &server.url())
        .args(["links", "100", "--summary"])
        .arg(&saved)
        .assert()
        .success()
        .stdout(predicate::str::contains("item?id=100#14"))
        .stdout(predicate::str::contains("[2](https://elsewhere.test)"));
}

#[test]
fn user_lookup_prints_karma() {
    let tmp = tempdir().expect("tempdir");
    let mut server = Server::new();
    server
        .mock("GET", "/user/alice.json")
        .with_body(r#"{"id": "alice", "karma": 321, "created": 1160418092}"#)
        .create();
    server.mock("GET", "/user/ghost.json").with_body("null").create();

    digest_cmd(tmp.path(), &server.url())
        .args(["user", "alice", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("alice karma=321 created=2006-10-09"))
        .stderr(predicate::str::contains("unknown user `ghost`"));
}
