//! Remote paper store abstraction.
//!
//! The [`PaperStore`] trait covers every remote operation the corpus layer
//! consumes. The store is authoritative for chunk identity (content hash)
//! and for search ranking; the client only reads snapshots and submits
//! mutations.
//!
//! | Method | Remote endpoint |
//! |--------|-----------------|
//! | [`list_papers`](PaperStore::list_papers) | `GET /papers` |
//! | [`upload`](PaperStore::upload) | `POST /papers/upload` (multipart) |
//! | [`search`](PaperStore::search) | `GET /papers/search` |
//! | [`add_selected`](PaperStore::add_selected) | `POST /papers/add-selected` |
//! | [`remove`](PaperStore::remove) | `DELETE /papers/remove/{hash}` |
//! | [`refresh`](PaperStore::refresh) | `POST /papers/refresh` |
//! | [`remove_duplicates`](PaperStore::remove_duplicates) | `POST /papers/remove-duplicates` |
//! | [`download`](PaperStore::download) | `POST /papers/download` |
//! | [`add_custom`](PaperStore::add_custom) | `POST /papers/add` |
//! | [`health`](PaperStore::health) | `GET /health` |
//!
//! Implementations: [`http::HttpStore`] talks to the real service,
//! [`memory::MemoryStore`] keeps everything in process for tests.

pub mod http;
pub mod memory;

use async_trait::async_trait;

use crate::error::CorpusResult;
use crate::models::{PaperChunk, SearchHit, SearchQuery, UploadRequest};

/// Remote content-addressed store of paper chunks.
///
/// Mutating methods return the server's human-readable message.
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Fetch the full catalog.
    async fn list_papers(&self) -> CorpusResult<Vec<PaperChunk>>;

    /// Ingest one document. The server chunks and hashes it.
    async fn upload(&self, request: &UploadRequest) -> CorpusResult<String>;

    /// Keyword search over the external paper source. Paging is server-side
    /// via `start_index`/`max_results`.
    async fn search(&self, query: &SearchQuery) -> CorpusResult<Vec<PaperChunk>>;

    /// Adopt search results into the catalog. Full payloads are sent along
    /// with the hashes because results may not exist remotely as entries.
    async fn add_selected(&self, hashes: &[String], papers: &[SearchHit]) -> CorpusResult<String>;

    /// Remove the document the chunk with `hash` belongs to.
    async fn remove(&self, hash: &str) -> CorpusResult<String>;

    async fn refresh(&self) -> CorpusResult<String>;

    async fn remove_duplicates(&self) -> CorpusResult<String>;

    /// Search and adopt every result in one server-side step.
    async fn download(&self, options: &SearchQuery) -> CorpusResult<String>;

    /// Add a paper from raw text.
    async fn add_custom(&self, title: &str, content: &str) -> CorpusResult<String>;

    async fn health(&self) -> CorpusResult<String>;
}
