//! In-memory [`PaperStore`] implementation for tests and offline use.
//!
//! Holds the catalog and an external "search source" in `RwLock`ed vectors.
//! Hashes are assigned by the store (`mem-<n>`), as the real service does.
//! Failures can be injected per uploaded file name and for catalog loads,
//! and every upload attempt is recorded in order.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{CorpusError, CorpusResult};
use crate::models::{PaperChunk, SearchHit, SearchQuery, Timestamp, UploadRequest};

use super::PaperStore;

/// In-memory store for tests.
pub struct MemoryStore {
    catalog: RwLock<Vec<PaperChunk>>,
    source: RwLock<Vec<PaperChunk>>,
    upload_failures: RwLock<HashMap<String, String>>,
    upload_attempts: RwLock<Vec<String>>,
    selected_batches: RwLock<Vec<Vec<String>>>,
    fail_list: AtomicBool,
    list_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            catalog: RwLock::new(Vec::new()),
            source: RwLock::new(Vec::new()),
            upload_failures: RwLock::new(HashMap::new()),
            upload_attempts: RwLock::new(Vec::new()),
            selected_batches: RwLock::new(Vec::new()),
            fail_list: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Seed the catalog.
    pub fn with_papers(papers: Vec<PaperChunk>) -> Self {
        let store = Self::new();
        *store.catalog.write().unwrap() = papers;
        store
    }

    /// Seed the external source that [`search`](PaperStore::search) queries.
    pub fn with_search_source(self, papers: Vec<PaperChunk>) -> Self {
        *self.source.write().unwrap() = papers;
        self
    }

    /// Make uploads of `file_name` fail with `message`.
    pub fn fail_upload(&self, file_name: &str, message: &str) {
        self.upload_failures
            .write()
            .unwrap()
            .insert(file_name.to_string(), message.to_string());
    }

    /// Make catalog loads fail until reset.
    pub fn set_list_failure(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// File names of every upload attempt, in call order.
    pub fn upload_attempts(&self) -> Vec<String> {
        self.upload_attempts.read().unwrap().clone()
    }

    /// Number of `list_papers` calls so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Hash lists received by `add_selected`, one entry per call.
    pub fn selected_batches(&self) -> Vec<Vec<String>> {
        self.selected_batches.read().unwrap().clone()
    }

    pub fn catalog_snapshot(&self) -> Vec<PaperChunk> {
        self.catalog.read().unwrap().clone()
    }

    fn next_chunk(&self, title: &str, content: &str) -> PaperChunk {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        PaperChunk::new(format!("mem-{}", n), title, content)
            .with_added_to_db(Timestamp::Epoch(1_700_000_000.0 + n as f64))
    }

    fn matches(query: &str, chunk: &PaperChunk) -> bool {
        let q = query.to_lowercase();
        q.is_empty()
            || chunk.title.to_lowercase().contains(&q)
            || chunk.content.to_lowercase().contains(&q)
    }

    fn page_of_source(&self, query: &SearchQuery) -> Vec<PaperChunk> {
        self.source
            .read()
            .unwrap()
            .iter()
            .filter(|c| Self::matches(&query.query, c))
            .skip(query.start_index)
            .take(query.max_results)
            .cloned()
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaperStore for MemoryStore {
    async fn list_papers(&self) -> CorpusResult<Vec<PaperChunk>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(CorpusError::Fetch("load papers failed: connection refused".into()));
        }
        Ok(self.catalog.read().unwrap().clone())
    }

    async fn upload(&self, request: &UploadRequest) -> CorpusResult<String> {
        self.upload_attempts
            .write()
            .unwrap()
            .push(request.file_name.clone());

        if let Some(msg) = self.upload_failures.read().unwrap().get(&request.file_name) {
            return Err(CorpusError::Fetch(msg.clone()));
        }

        let title = request
            .title
            .clone()
            .unwrap_or_else(|| request.file_name.clone());
        let content = String::from_utf8_lossy(&request.bytes).to_string();
        let chunk = self.next_chunk(&title, &content);
        self.catalog.write().unwrap().push(chunk);
        Ok(format!("Paper '{}' added successfully", title))
    }

    async fn search(&self, query: &SearchQuery) -> CorpusResult<Vec<PaperChunk>> {
        Ok(self.page_of_source(query))
    }

    async fn add_selected(&self, hashes: &[String], papers: &[SearchHit]) -> CorpusResult<String> {
        self.selected_batches.write().unwrap().push(hashes.to_vec());
        let mut catalog = self.catalog.write().unwrap();
        let mut added = 0;
        for hash in hashes {
            if catalog.iter().any(|c| &c.hash == hash) {
                continue;
            }
            if let Some(hit) = papers.iter().find(|h| &h.chunk.hash == hash) {
                let mut chunk = hit.chunk.clone();
                chunk.similarity = None;
                chunk.relevance_factors = None;
                catalog.push(chunk);
                added += 1;
            }
        }
        Ok(format!("Added {} papers to the database", added))
    }

    async fn remove(&self, hash: &str) -> CorpusResult<String> {
        let mut catalog = self.catalog.write().unwrap();
        let title = match catalog.iter().find(|c| c.hash == hash) {
            Some(c) => c.title.clone(),
            None => return Err(CorpusError::Fetch(format!("Paper not found: {}", hash))),
        };
        catalog.retain(|c| c.title != title);
        Ok(format!("Paper '{}' removed", title))
    }

    async fn refresh(&self) -> CorpusResult<String> {
        Ok("Papers refreshed".to_string())
    }

    async fn remove_duplicates(&self) -> CorpusResult<String> {
        let mut catalog = self.catalog.write().unwrap();
        let before = catalog.len();
        let mut seen = HashSet::new();
        catalog.retain(|c| seen.insert((c.title.clone(), c.content.clone())));
        Ok(format!("Removed {} duplicate chunks", before - catalog.len()))
    }

    async fn download(&self, options: &SearchQuery) -> CorpusResult<String> {
        let found = self.page_of_source(options);
        let mut catalog = self.catalog.write().unwrap();
        let mut added = 0;
        for chunk in found {
            if !catalog.iter().any(|c| c.hash == chunk.hash) {
                catalog.push(chunk);
                added += 1;
            }
        }
        Ok(format!("Downloaded {} papers", added))
    }

    async fn add_custom(&self, title: &str, content: &str) -> CorpusResult<String> {
        let chunk = self.next_chunk(title, content);
        self.catalog.write().unwrap().push(chunk);
        Ok(format!("Paper '{}' added successfully", title))
    }

    async fn health(&self) -> CorpusResult<String> {
        Ok("healthy".to_string())
    }
}
