//! HTTP client for the remote paper service.
//!
//! All calls carry a bearer token when one is configured. Status handling:
//! - 2xx with `{"status": "error"}` in the body → [`CorpusError::Fetch`]
//! - 413 → [`CorpusError::PayloadTooLarge`], 429 → [`CorpusError::RateLimited`]
//!   (server `message` verbatim if present, fixed default otherwise)
//! - any other non-2xx or transport failure → [`CorpusError::Fetch`]
//!
//! No retries: a failed call surfaces once and the caller decides.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::{classify_status, CorpusError, CorpusResult};
use crate::models::{
    MessageResponse, PaperChunk, PapersResponse, SearchHit, SearchQuery, UploadRequest,
};
use crate::store::PaperStore;
use crate::upload::content_type_for;

pub struct HttpStore {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpStore {
    /// Build a client from `[remote]` configuration.
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token(),
        })
    }

    /// Client against `base_url` with an explicit token (or none).
    pub fn with_token(base_url: &str, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let rb = self.client.request(method, url);
        match &self.token {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    async fn send(&self, rb: RequestBuilder, operation: &str) -> CorpusResult<Response> {
        tracing::debug!(operation, "remote call");
        let response = rb
            .send()
            .await
            .map_err(|e| CorpusError::Fetch(format!("{} failed: {}", operation, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let server_message = serde_json::from_str::<MessageResponse>(&body)
            .ok()
            .and_then(|m| m.text().map(str::to_string));
        tracing::debug!(operation, status = status.as_u16(), "remote call rejected");
        Err(classify_status(status.as_u16(), server_message, operation))
    }

    async fn json<T: DeserializeOwned>(&self, rb: RequestBuilder, operation: &str) -> CorpusResult<T> {
        let response = self.send(rb, operation).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CorpusError::Fetch(format!("{}: malformed response: {}", operation, e)))
    }

    async fn message(&self, rb: RequestBuilder, operation: &str) -> CorpusResult<String> {
        let resp: MessageResponse = self.json(rb, operation).await?;
        if resp.is_error() {
            return Err(CorpusError::Fetch(
                resp.text()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} failed", operation)),
            ));
        }
        Ok(resp.text().unwrap_or("ok").to_string())
    }
}

#[async_trait]
impl PaperStore for HttpStore {
    async fn list_papers(&self) -> CorpusResult<Vec<PaperChunk>> {
        let resp: PapersResponse = self
            .json(self.request(Method::GET, "/papers"), "load papers")
            .await?;
        Ok(resp.papers)
    }

    async fn upload(&self, request: &UploadRequest) -> CorpusResult<String> {
        let part = Part::bytes(request.bytes.clone())
            .file_name(request.file_name.clone())
            .mime_str(content_type_for(&request.file_name))
            .map_err(|e| CorpusError::Fetch(format!("upload failed: {}", e)))?;
        let mut form = Form::new().part("file", part);
        if let Some(title) = request.title.as_deref().filter(|t| !t.trim().is_empty()) {
            form = form.text("title", title.to_string());
        }
        self.message(
            self.request(Method::POST, "/papers/upload").multipart(form),
            "upload",
        )
        .await
    }

    async fn search(&self, query: &SearchQuery) -> CorpusResult<Vec<PaperChunk>> {
        let resp: PapersResponse = self
            .json(
                self.request(Method::GET, "/papers/search").query(query),
                "search papers",
            )
            .await?;
        Ok(resp.papers)
    }

    async fn add_selected(&self, hashes: &[String], papers: &[SearchHit]) -> CorpusResult<String> {
        let body = serde_json::json!({
            "paper_hashes": hashes,
            "papers": papers,
        });
        self.message(
            self.request(Method::POST, "/papers/add-selected").json(&body),
            "add selected papers",
        )
        .await
    }

    async fn remove(&self, hash: &str) -> CorpusResult<String> {
        let path = format!("/papers/remove/{}", urlencoding::encode(hash));
        self.message(self.request(Method::DELETE, &path), "remove paper")
            .await
    }

    async fn refresh(&self) -> CorpusResult<String> {
        self.message(self.request(Method::POST, "/papers/refresh"), "refresh papers")
            .await
    }

    async fn remove_duplicates(&self) -> CorpusResult<String> {
        self.message(
            self.request(Method::POST, "/papers/remove-duplicates"),
            "remove duplicates",
        )
        .await
    }

    async fn download(&self, options: &SearchQuery) -> CorpusResult<String> {
        self.message(
            self.request(Method::POST, "/papers/download").json(options),
            "download papers",
        )
        .await
    }

    async fn add_custom(&self, title: &str, content: &str) -> CorpusResult<String> {
        let body = serde_json::json!({ "title": title, "content": content });
        self.message(
            self.request(Method::POST, "/papers/add").json(&body),
            "add paper",
        )
        .await
    }

    async fn health(&self) -> CorpusResult<String> {
        let v: serde_json::Value = self
            .json(self.request(Method::GET, "/health"), "health check")
            .await?;
        Ok(v.get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = HttpStore::with_token("http://localhost:5000/", None);
        assert_eq!(store.base_url(), "http://localhost:5000");
    }

    #[test]
    fn timeout_zero_builds_client() {
        let cfg = RemoteConfig::default();
        let store = HttpStore::new(&cfg).unwrap();
        assert_eq!(store.base_url(), "http://localhost:5000");
    }
}
