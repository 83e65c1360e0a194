//! End-to-end tests: run the `papers` binary against a mock paper service.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Output;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn papers_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_papers"))
}

/// Temp dir holding a config that points at `base_url`.
fn setup_test_env(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("papers.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"[remote]
base_url = "{}"

[catalog]
papers_per_page = 6

[upload]
max_bytes = 15728640
"#,
            base_url
        ),
    )
    .unwrap();
    (tmp, config_path)
}

async fn run_papers(config: &Path, args: &[&str]) -> Output {
    tokio::process::Command::new(papers_binary())
        .arg("--config")
        .arg(config)
        .args(["--progress", "off"])
        .args(args)
        .env_remove("PAPERS_URL")
        .env("RUST_LOG", "off")
        .output()
        .await
        .expect("failed to run papers")
}

fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, body) in files {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

async fn mount_catalog(server: &MockServer, papers: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/papers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "papers": papers })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_groups_by_title() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        json!([
            {"hash": "a", "title": "T1", "content": "first chunk", "added_to_db": "2024-02-01T00:00:00"},
            {"hash": "b", "title": "T1", "content": "second chunk", "added_to_db": "2024-02-01T00:00:00"},
            {"hash": "c", "title": "T2", "content": "other paper", "added_to_db": "2024-01-01T00:00:00"},
            {"hash": "s", "title": "Init", "content": "initialization"}
        ]),
    )
    .await;
    let (_tmp, config) = setup_test_env(&server.uri());

    let output = run_papers(&config, &["list"]).await;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Page 1/1"));
    assert!(stdout.contains("## T1  (2 chunks)"));
    assert!(stdout.contains("## T2  (1 chunks)"));
    assert!(!stdout.contains("Init"));
    let t1 = stdout.find("## T1").unwrap();
    let t2 = stdout.find("## T2").unwrap();
    assert!(t1 < t2, "newest paper first");
}

#[tokio::test]
async fn test_list_json_respects_filter() {
    let server = MockServer::start().await;
    mount_catalog(
        &server,
        json!([
            {"hash": "a", "title": "Fetal Doppler", "content": "x"},
            {"hash": "b", "title": "Gestational diabetes", "content": "y"}
        ]),
    )
    .await;
    let (_tmp, config) = setup_test_env(&server.uri());

    let output = run_papers(&config, &["list", "--filter", "doppler", "--json"]).await;
    assert!(output.status.success());
    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["groups"].as_array().unwrap().len(), 1);
    assert_eq!(view["groups"][0]["title"], "Fetal Doppler");
    assert_eq!(view["controls"]["total_pages"], 1);
}

#[tokio::test]
async fn test_list_fails_when_service_down() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:1");
    let output = run_papers(&config, &["list"]).await;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load papers"));
}

fn notifications(stderr: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stderr)
        .lines()
        .filter_map(|l| serde_json::from_str(l).ok())
        .filter(|v: &serde_json::Value| v["event"] == "notification")
        .collect()
}

#[tokio::test]
async fn test_search_stops_when_catalog_load_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/papers"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "db down"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/papers/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "papers": [{"hash": "known", "title": "Known", "content": "x"}]
        })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/papers/add-selected"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "added"})))
        .expect(0)
        .mount(&server)
        .await;
    let (_tmp, config) = setup_test_env(&server.uri());

    let output = run_papers(
        &config,
        &["--notify", "json", "search", "ctg", "--select", "known"],
    )
    .await;
    assert_eq!(output.status.code(), Some(1));
    let notes = notifications(&output.stderr);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["level"], "error");
    assert!(notes[0]["message"].as_str().unwrap().contains("db down"));
}

#[tokio::test]
async fn test_search_prints_one_notification() {
    let server = MockServer::start().await;
    mount_catalog(&server, json!([{"hash": "known", "title": "Known", "content": "x"}])).await;
    Mock::given(method("GET"))
        .and(path("/papers/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "papers": [
                {"hash": "known", "title": "Known", "content": "x"},
                {"hash": "fresh", "title": "Fresh", "content": "y"}
            ]
        })))
        .mount(&server)
        .await;
    let (_tmp, config) = setup_test_env(&server.uri());

    let output = run_papers(&config, &["--notify", "json", "search", "ctg"]).await;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("* known"));
    assert!(stdout.contains("  fresh"));
    let notes = notifications(&output.stderr);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["message"], "Found 2 papers");
}

#[tokio::test]
async fn test_remove_stops_when_catalog_load_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/papers"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/papers/remove/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "removed"})))
        .expect(0)
        .mount(&server)
        .await;
    let (_tmp, config) = setup_test_env(&server.uri());

    let output = run_papers(&config, &["--notify", "json", "remove", "abc", "--yes"]).await;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(notifications(&output.stderr).len(), 1);
}

#[tokio::test]
async fn test_ingest_partial_failure() {
    let server = MockServer::start().await;
    mount_catalog(&server, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/papers/upload"))
        .and(body_string_contains("bad.pdf"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "server error"})))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/papers/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "uploaded"})))
        .with_priority(2)
        .mount(&server)
        .await;

    let (tmp, config) = setup_test_env(&server.uri());
    let archive = tmp.path().join("papers.zip");
    std::fs::write(
        &archive,
        zip_of(&[("ok1.pdf", b"one"), ("ok2.pdf", b"two"), ("bad.pdf", b"three")]),
    )
    .unwrap();

    let output = run_papers(
        &config,
        &["--notify", "json", "ingest", archive.to_str().unwrap()],
    )
    .await;
    assert_eq!(output.status.code(), Some(1));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("uploaded 2 / 3 files"));
    assert!(stdout.contains("failed: bad.pdf  server error"));

    let notes = notifications(&output.stderr);
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["level"], "error");
    assert!(notes[0]["message"].as_str().unwrap().contains("bad.pdf"));

    let requests = server.received_requests().await.unwrap();
    let uploads = requests.iter().filter(|r| r.url.path() == "/papers/upload").count();
    let reloads = requests.iter().filter(|r| r.url.path() == "/papers").count();
    assert_eq!(uploads, 3);
    assert_eq!(reloads, 1);
}

#[tokio::test]
async fn test_oversized_upload_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/papers/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "uploaded"})))
        .expect(0)
        .mount(&server)
        .await;

    let (tmp, config) = setup_test_env(&server.uri());
    let big = tmp.path().join("big.pdf");
    std::fs::write(&big, vec![0u8; 20 * 1024 * 1024]).unwrap();

    let output = run_papers(&config, &["upload", big.to_str().unwrap()]).await;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("too large"));
}

#[tokio::test]
async fn test_remove_with_yes_reloads() {
    let server = MockServer::start().await;
    mount_catalog(&server, json!([{"hash": "abc", "title": "T", "content": "x"}])).await;
    Mock::given(method("DELETE"))
        .and(path("/papers/remove/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Paper removed"})))
        .expect(1)
        .mount(&server)
        .await;
    let (_tmp, config) = setup_test_env(&server.uri());

    let output = run_papers(&config, &["remove", "abc", "--yes"]).await;
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ok: Paper removed"));
}

#[tokio::test]
async fn test_prefill_prints_form_values() {
    let tmp = TempDir::new().unwrap();
    let headers = [
        "baseline value",
        "accelerations",
        "fetal_movement",
        "uterine_contractions",
        "light_decelerations",
        "severe_decelerations",
        "prolongued_decelerations",
        "abnormal_short_term_variability",
        "mean_value_of_short_term_variability",
        "percentage_of_time_with_abnormal_long_term_variability",
        "mean_value_of_long_term_variability",
        "histogram_width",
        "histogram_min",
        "histogram_max",
        "histogram_number_of_peaks",
        "histogram_number_of_zeroes",
        "histogram_mode",
        "histogram_mean",
        "histogram_median",
        "histogram_variance",
        "histogram_tendency",
        "fetal_health",
    ];
    let values: Vec<String> = (0..headers.len()).map(|i| (i * 2).to_string()).collect();
    let csv = tmp.path().join("row.csv");
    std::fs::write(&csv, format!("{}\n{}\n", headers.join(","), values.join(","))).unwrap();

    let output = run_papers(&tmp.path().join("missing.toml"), &["prefill", csv.to_str().unwrap()]).await;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let form: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(form["baseline_value"], 0.0);
    assert_eq!(form["accelerations"], 2.0);
    assert!(form.get("fetal_health").is_none());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("papers.toml");
    std::fs::write(&config, "[catalog]\npapers_per_page = 7\n").unwrap();
    let output = run_papers(&config, &["health"]).await;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("papers_per_page"));
}
