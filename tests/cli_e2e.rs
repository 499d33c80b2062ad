//! End-to-end tests for the feed-downloader binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command with an isolated config home so a user config never leaks in.
fn isolated_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("feed-downloader").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("RUST_LOG");
    cmd
}

fn write_references(dir: &TempDir, urls: &[String]) -> std::path::PathBuf {
    let refs: Vec<serde_json::Value> = urls
        .iter()
        .map(|url| {
            serde_json::json!({
                "url": url,
                "post_id": 4242,
                "post_name": "Weekly update",
                "date": "2023-11-02",
                "url_type": "post_file",
            })
        })
        .collect();
    let path = dir.path().join("references.json");
    std::fs::write(&path, serde_json::to_string(&refs).unwrap()).unwrap();
    path
}

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("feed-downloader").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("extract"));
}

#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("feed-downloader").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("feed-downloader"));
}

#[test]
fn test_binary_download_help_lists_flags() {
    let mut cmd = Command::cargo_bin("feed-downloader").unwrap();
    cmd.args(["download", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--references"))
        .stdout(predicate::str::contains("--overwrite-files"))
        .stdout(predicate::str::contains("--url-blacklist"));
}

#[test]
fn test_binary_invalid_flag_fails() {
    let mut cmd = Command::cargo_bin("feed-downloader").unwrap();
    cmd.args(["download", "--invalid-flag"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_malformed_reference_list_fails() {
    let home = TempDir::new().unwrap();
    let refs = home.path().join("broken.json");
    std::fs::write(&refs, "{ not json").unwrap();

    isolated_cmd(&home)
        .arg("download")
        .arg("--references")
        .arg(&refs)
        .arg("--plugins-dir")
        .arg(home.path().join("plugins"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to parse reference list JSON"));
}

#[test]
fn test_binary_missing_reference_file_fails() {
    let home = TempDir::new().unwrap();

    isolated_cmd(&home)
        .arg("download")
        .arg("--references")
        .arg(home.path().join("absent.json"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to read reference list"));
}

#[test]
fn test_binary_empty_reference_list_succeeds() {
    let home = TempDir::new().unwrap();
    let refs = write_references(&home, &[]);

    isolated_cmd(&home)
        .arg("download")
        .arg("--references")
        .arg(&refs)
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing to download"));
}

#[test]
fn test_binary_empty_stdin_list_succeeds() {
    let home = TempDir::new().unwrap();

    isolated_cmd(&home)
        .arg("download")
        .write_stdin("[]")
        .assert()
        .success();
}

#[test]
fn test_binary_invalid_config_fails() {
    let home = TempDir::new().unwrap();
    let config_dir = home.path().join("feed-downloader");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "connect_timeout_secs = 0\n").unwrap();

    isolated_cmd(&home)
        .arg("download")
        .write_stdin("[]")
        .assert()
        .code(1);
}

#[test]
fn test_binary_extract_prints_deduplicated_links() {
    let home = TempDir::new().unwrap();
    let html = home.path().join("post.html");
    std::fs::write(
        &html,
        r#"<html><body>
            <img src="https://cdn.example.com/cover.png">
            <a href="https://files.example.com/pack.zip">pack</a>
            <a href="https://cdn.example.com/cover.png">again</a>
            <a href="https://www.youtube.com/watch?v=abc">video</a>
        </body></html>"#,
    )
    .unwrap();

    isolated_cmd(&home)
        .arg("extract")
        .arg("--html")
        .arg(&html)
        .arg("--plugins-dir")
        .arg(home.path().join("plugins"))
        .assert()
        .success()
        .stdout(predicate::eq(
            "https://cdn.example.com/cover.png\nhttps://files.example.com/pack.zip\n",
        ));
}

#[tokio::test]
async fn test_binary_download_writes_files_under_post_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/art/sketch.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let out = home.path().join("out");
    let refs = write_references(&home, &[format!("{}/art/sketch.png", server.uri())]);

    isolated_cmd(&home)
        .arg("-q")
        .arg("download")
        .arg("--references")
        .arg(&refs)
        .arg("-o")
        .arg(&out)
        .arg("--plugins-dir")
        .arg(home.path().join("plugins"))
        .assert()
        .success();

    let written = out
        .join("202311")
        .join("[4242]Weekly update")
        .join("4242_post_sketch.png");
    assert_eq!(std::fs::read(written).unwrap(), b"PNGDATA");
}

#[tokio::test]
async fn test_binary_download_partial_failure_exit_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let refs = write_references(
        &home,
        &[
            format!("{}/ok.png", server.uri()),
            format!("{}/missing.png", server.uri()),
        ],
    );

    isolated_cmd(&home)
        .arg("download")
        .arg("--references")
        .arg(&refs)
        .arg("-o")
        .arg(home.path().join("out"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Download complete"));
}

#[tokio::test]
async fn test_binary_download_blacklist_skips_reference() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blocked.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"x".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let refs = write_references(&home, &[format!("{}/blocked.png", server.uri())]);

    isolated_cmd(&home)
        .arg("download")
        .arg("--references")
        .arg(&refs)
        .arg("-o")
        .arg(home.path().join("out"))
        .arg("--url-blacklist")
        .arg("blocked.png|other.example")
        .assert()
        .success();
}
