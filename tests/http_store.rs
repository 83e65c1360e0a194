//! Contract tests for the HTTP store against a mock server.

use paper_sync::error::CorpusError;
use paper_sync::models::{PaperChunk, SearchHit, SearchQuery, UploadRequest};
use paper_sync::store::http::HttpStore;
use paper_sync::store::PaperStore;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query(q: &str) -> SearchQuery {
    SearchQuery {
        query: q.to_string(),
        max_results: 10,
        start_index: 20,
        start_date: Some("2020-01-01".to_string()),
        end_date: None,
    }
}

#[tokio::test]
async fn list_sends_bearer_token_and_parses_papers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/papers"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "papers": [
                {"hash": "h1", "title": "T1", "content": "text", "added_to_db": "2024-05-01T10:00:00", "source": "pubmed"},
                {"hash": "h0", "title": null, "content": "initialization"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), Some("secret".into()));
    let papers = store.list_papers().await.unwrap();
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[0].title, "T1");
    assert_eq!(papers[0].extra["source"], "pubmed");
    assert_eq!(papers[1].title, "");
    assert!(!papers[1].is_visible());
}

#[tokio::test]
async fn search_forwards_paging_and_dates_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/papers/search"))
        .and(query_param("query", "ctg"))
        .and(query_param("max_results", "10"))
        .and(query_param("start_index", "20"))
        .and(query_param("start_date", "2020-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "papers": [{"hash": "s1", "title": "CTG", "content": "abc", "similarity": 88.5}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), None);
    let found = store.search(&query("ctg")).await.unwrap();
    assert_eq!(found[0].similarity, Some(88.5));
}

#[tokio::test]
async fn status_413_and_429_map_to_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/papers/upload"))
        .and(body_string_contains("big.pdf"))
        .respond_with(ResponseTemplate::new(413))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/papers/upload"))
        .and(body_string_contains("busy.pdf"))
        .respond_with(
            ResponseTemplate::new(429).set_body_json(json!({"message": "Slow down please"})),
        )
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), None);
    let err = store
        .upload(&UploadRequest::new("big.pdf", b"x".to_vec(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, CorpusError::PayloadTooLarge(_)));
    assert_eq!(err.to_string(), "File too large. Maximum allowed size is 16MB.");

    let err = store
        .upload(&UploadRequest::new("busy.pdf", b"x".to_vec(), None))
        .await
        .unwrap_err();
    assert!(matches!(err, CorpusError::RateLimited(_)));
    assert_eq!(err.to_string(), "Slow down please");
}

#[tokio::test]
async fn upload_sends_multipart_file_and_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/papers/upload"))
        .and(body_string_contains("name=\"file\"; filename=\"study.pdf\""))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("My Study"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Paper uploaded"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), None);
    let msg = store
        .upload(&UploadRequest::new("study.pdf", b"%PDF".to_vec(), Some("My Study".into())))
        .await
        .unwrap();
    assert_eq!(msg, "Paper uploaded");
}

#[tokio::test]
async fn add_selected_posts_hashes_and_full_results() {
    let server = MockServer::start().await;
    let hit = SearchHit {
        chunk: PaperChunk::new("n1", "New", "body"),
        exists_in_db: false,
    };
    Mock::given(method("POST"))
        .and(path("/papers/add-selected"))
        .and(body_json(json!({
            "paper_hashes": ["n1"],
            "papers": [{"hash": "n1", "title": "New", "content": "body", "exists_in_db": false}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Added 1 papers"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), None);
    let msg = store.add_selected(&["n1".to_string()], &[hit]).await.unwrap();
    assert_eq!(msg, "Added 1 papers");
}

#[tokio::test]
async fn remove_uses_delete_with_hash_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/papers/remove/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "removed"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), None);
    assert_eq!(store.remove("abc123").await.unwrap(), "removed");
}

#[tokio::test]
async fn error_status_in_success_body_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/papers/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "error", "message": "index locked"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/papers/remove-duplicates"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), None);
    let err = store.refresh().await.unwrap_err();
    assert!(matches!(err, CorpusError::Fetch(ref m) if m == "index locked"));

    let err = store.remove_duplicates().await.unwrap_err();
    assert_eq!(err.to_string(), "remove duplicates failed: HTTP 500");
}

#[tokio::test]
async fn download_and_add_custom_send_json_bodies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/papers/download"))
        .and(body_json(json!({
            "query": "ctg",
            "max_results": 10,
            "start_index": 20,
            "start_date": "2020-01-01"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Downloaded 3"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/papers/add"))
        .and(body_json(json!({"title": "Notes", "content": "Raw text"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "added"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "healthy"})))
        .mount(&server)
        .await;

    let store = HttpStore::with_token(&server.uri(), None);
    assert_eq!(store.download(&query("ctg")).await.unwrap(), "Downloaded 3");
    assert_eq!(store.add_custom("Notes", "Raw text").await.unwrap(), "added");
    assert_eq!(store.health().await.unwrap(), "healthy");
}

#[tokio::test]
async fn unreachable_server_is_fetch_error() {
    let store = HttpStore::with_token("http://127.0.0.1:1", None);
    assert!(matches!(
        store.list_papers().await,
        Err(CorpusError::Fetch(_))
    ));
}
