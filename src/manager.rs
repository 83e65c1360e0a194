//! The paper manager: one owner for the catalog cache, the search session,
//! chunk cursors and the upload form, with one method per user action.
//!
//! Every remote action ends in exactly one [`Notification`], which is both
//! emitted through the configured [`Notifier`] and returned to the caller.
//! Errors stop at this boundary; cached state stays at its last good value.
//! Mutations that change the catalog reload it before the action returns,
//! and a failed reload is folded into the action's single notification.
//!
//! Pure state changes (paging, filtering, toggling a selection) do not
//! notify.

use std::path::Path;

use serde::Serialize;

use crate::catalog::CatalogCache;
use crate::config::{Config, MAX_RESULTS_CHOICES};
use crate::error::{CorpusError, CorpusResult};
use crate::ingest::{IngestPipeline, IngestSummary, MemberFilter};
use crate::models::{PaperChunk, SearchHit, SearchQuery};
use crate::notify::{Notification, Notifier};
use crate::pagination::{ChunkCursors, Navigation, PageControls};
use crate::progress::IngestProgressReporter;
use crate::search::{SearchRequest, SearchSession};
use crate::store::PaperStore;
use crate::upload::{read_upload, UploadForm};

/// One paper group as rendered: the visible chunk page plus its controls.
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub title: String,
    pub total_chunks: usize,
    pub chunks: Vec<PaperChunk>,
    /// `None` when the group fits on one chunk page.
    pub chunk_controls: Option<PageControls>,
}

/// The current catalog page.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogView {
    pub title_filter: String,
    pub papers_per_page: usize,
    pub controls: PageControls,
    pub groups: Vec<GroupView>,
}

pub struct PaperManager<S: PaperStore> {
    store: S,
    config: Config,
    catalog: CatalogCache,
    cursors: ChunkCursors,
    search: SearchSession,
    upload_form: UploadForm,
    member_filter: MemberFilter,
    notifier: Box<dyn Notifier>,
    progress: Box<dyn IngestProgressReporter>,
}

impl<S: PaperStore> PaperManager<S> {
    pub fn new(
        store: S,
        config: Config,
        notifier: Box<dyn Notifier>,
        progress: Box<dyn IngestProgressReporter>,
    ) -> anyhow::Result<Self> {
        let member_filter = MemberFilter::new(&config.ingest.allowed_extensions)?;
        Ok(Self {
            catalog: CatalogCache::new(config.catalog.papers_per_page),
            cursors: ChunkCursors::new(config.catalog.chunks_per_page),
            search: SearchSession::new(config.search.max_search_page),
            upload_form: UploadForm::new(),
            member_filter,
            store,
            config,
            notifier,
            progress,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn search_session(&self) -> &SearchSession {
        &self.search
    }

    pub fn upload_form(&self) -> &UploadForm {
        &self.upload_form
    }

    fn emit(&self, notification: Notification) -> Notification {
        match notification.level {
            crate::notify::Level::Error => tracing::debug!(message = %notification.message, "action failed"),
            _ => tracing::debug!(message = %notification.message, "action finished"),
        }
        self.notifier.notify(&notification);
        notification
    }

    /// Reload the catalog and prune chunk cursors of vanished groups.
    async fn reload(&mut self) -> CorpusResult<usize> {
        let n = self.catalog.load(&self.store).await?;
        self.prune_cursors();
        Ok(n)
    }

    fn prune_cursors(&mut self) {
        let groups = self.catalog.grouped();
        self.cursors.retain_groups(&groups);
    }

    /// Success notification for a mutation, noting a failed follow-up reload.
    fn mutation_done(&self, message: String, reload: CorpusResult<usize>) -> Notification {
        match reload {
            Ok(_) => Notification::success(message),
            Err(e) => {
                tracing::warn!(error = %e, "catalog reload after mutation failed");
                Notification::success(format!("{} (catalog reload failed: {})", message, e))
            }
        }
    }

    // ---- catalog ----

    pub async fn load_papers(&mut self) -> Notification {
        let note = match self.reload().await {
            Ok(n) => Notification::info(format!("Loaded {} chunks", n)),
            Err(e) => Notification::error(format!("Failed to load papers: {}", e)),
        };
        self.emit(note)
    }

    /// Reload ahead of an action that reads the catalog. Success is silent;
    /// a failure is emitted and handed back as that action's notification.
    pub async fn sync_catalog(&mut self) -> Result<usize, Notification> {
        let result = self.reload().await;
        result.map_err(|e| self.emit(Notification::error(format!("Failed to load papers: {}", e))))
    }

    pub fn set_title_filter(&mut self, filter: &str) {
        self.catalog.set_title_filter(filter);
    }

    pub fn set_papers_per_page(&mut self, n: usize) -> CorpusResult<()> {
        self.catalog.set_papers_per_page(n)
    }

    pub fn go_to_page(&mut self, page: usize) -> Navigation {
        self.catalog.go_to_page(page)
    }

    pub fn next_page(&mut self) -> Navigation {
        self.catalog.next_page()
    }

    pub fn previous_page(&mut self) -> Navigation {
        self.catalog.previous_page()
    }

    /// Move the chunk cursor of group `title`. Refused (false) when the
    /// group is not in the current view or the page is out of range.
    pub fn go_to_chunk_page(&mut self, title: &str, page: usize) -> bool {
        let groups = self.catalog.grouped();
        match groups.iter().find(|g| g.title == title) {
            Some(group) => self.cursors.go_to(title, page, group.chunks.len()),
            None => false,
        }
    }

    pub fn view(&self) -> CatalogView {
        let groups = self
            .catalog
            .current_page()
            .into_iter()
            .map(|group| {
                let total = group.chunks.len();
                GroupView {
                    chunks: self.cursors.visible_chunks(&group).to_vec(),
                    chunk_controls: self
                        .cursors
                        .shows_controls(total)
                        .then(|| self.cursors.controls(&group.title, total)),
                    total_chunks: total,
                    title: group.title,
                }
            })
            .collect();
        CatalogView {
            title_filter: self.catalog.title_filter().to_string(),
            papers_per_page: self.catalog.papers_per_page(),
            controls: self.catalog.page_controls(),
            groups,
        }
    }

    // ---- search ----

    pub fn search_request(&self, query: &str) -> SearchRequest {
        SearchRequest::new(query, self.config.search.max_results)
    }

    pub async fn search(&mut self, request: &SearchRequest) -> Notification {
        if !MAX_RESULTS_CHOICES.contains(&request.max_results) {
            return self.emit(Notification::error(format!(
                "max results must be one of {:?}",
                MAX_RESULTS_CHOICES
            )));
        }
        let note = match self.search.search(&self.store, &self.catalog, request).await {
            Ok(n) => Notification::info(format!("Found {} papers", n)),
            Err(e @ CorpusError::InvalidSelection(_)) => Notification::error(e.to_string()),
            Err(e) => Notification::error(format!("Failed to search papers: {}", e)),
        };
        self.emit(note)
    }

    pub fn search_results(&self) -> &[SearchHit] {
        self.search.results()
    }

    pub fn toggle_select(&mut self, hash: &str) -> CorpusResult<bool> {
        self.search.toggle_select(hash)
    }

    pub async fn add_selected(&mut self) -> Notification {
        let result = self.search.add_selected(&self.store, &mut self.catalog).await;
        let note = match result {
            Ok(added) => {
                self.prune_cursors();
                match added.reload_error {
                    None => Notification::success(added.message),
                    Some(e) => Notification::success(format!(
                        "{} (catalog reload failed: {})",
                        added.message, e
                    )),
                }
            }
            Err(e @ CorpusError::InvalidSelection(_)) => Notification::error(e.to_string()),
            Err(e) => Notification::error(format!("Failed to add selected papers: {}", e)),
        };
        self.emit(note)
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    // ---- single upload ----

    pub fn select_file(&mut self, file_name: &str, bytes: Vec<u8>) {
        self.upload_form.select(file_name, bytes);
    }

    pub fn set_upload_title(&mut self, title: &str) {
        self.upload_form.set_title(title);
    }

    /// Submit the upload form. Error messages are shown verbatim.
    pub async fn upload(&mut self) -> Notification {
        let result = self
            .upload_form
            .submit(
                &self.store,
                self.config.upload.max_bytes,
                &self.config.ingest.allowed_extensions,
            )
            .await;
        let note = match result {
            Ok(message) => {
                let reload = self.reload().await;
                self.mutation_done(message, reload)
            }
            Err(e) => Notification::error(e.to_string()),
        };
        self.emit(note)
    }

    /// Read `path` (size checked before reading) and upload it.
    pub async fn upload_file(&mut self, path: &Path, title: Option<&str>) -> Notification {
        match read_upload(path, None, self.config.upload.max_bytes).await {
            Ok(request) => {
                if let Some(title) = title {
                    self.upload_form.set_title(title);
                }
                self.upload_form.select(&request.file_name, request.bytes);
                self.upload().await
            }
            Err(e) => {
                self.upload_form.clear();
                self.emit(Notification::error(e.to_string()))
            }
        }
    }

    // ---- bulk ingestion ----

    /// Upload every supported member of a zip archive. The catalog is
    /// reloaded once afterwards, whether or not some members failed.
    pub async fn ingest_archive(&mut self, archive: &[u8]) -> (Notification, Option<IngestSummary>) {
        let pipeline = IngestPipeline::new(
            &self.store,
            &self.member_filter,
            self.progress.as_ref(),
            self.config.upload.max_bytes,
        )
        .concurrency(self.config.ingest.concurrency);

        let result = pipeline.ingest(archive).await;
        match result {
            Ok(summary) => {
                let mut note = summary.notification();
                if let Err(e) = self.reload().await {
                    tracing::warn!(error = %e, "catalog reload after ingest failed");
                    note.message = format!("{} (catalog reload failed: {})", note.message, e);
                }
                (self.emit(note), Some(summary))
            }
            Err(e) => (self.emit(Notification::error(e.to_string())), None),
        }
    }

    pub async fn ingest_file(&mut self, path: &Path) -> (Notification, Option<IngestSummary>) {
        match tokio::fs::read(path).await {
            Ok(bytes) => self.ingest_archive(&bytes).await,
            Err(e) => {
                let err = CorpusError::from(e);
                (
                    self.emit(Notification::error(format!(
                        "Failed to read {}: {}",
                        path.display(),
                        err
                    ))),
                    None,
                )
            }
        }
    }

    // ---- maintenance ----

    /// Remove the document holding chunk `hash` after `confirm` agrees.
    pub async fn remove<F>(&mut self, hash: &str, confirm: F) -> Notification
    where
        F: FnOnce(&str) -> bool,
    {
        if !confirm(hash) {
            return self.emit(Notification::info("Removal cancelled"));
        }
        let result = self.store.remove(hash).await;
        let note = match result {
            Ok(message) => {
                let reload = self.reload().await;
                self.mutation_done(message, reload)
            }
            Err(e) => Notification::error(format!("Failed to remove paper: {}", e)),
        };
        self.emit(note)
    }

    pub async fn refresh(&mut self) -> Notification {
        let result = self.store.refresh().await;
        let note = match result {
            Ok(message) => {
                let reload = self.reload().await;
                self.mutation_done(message, reload)
            }
            Err(e) => Notification::error(format!("Failed to refresh papers: {}", e)),
        };
        self.emit(note)
    }

    pub async fn remove_duplicates(&mut self) -> Notification {
        let result = self.store.remove_duplicates().await;
        let note = match result {
            Ok(message) => {
                let reload = self.reload().await;
                self.mutation_done(message, reload)
            }
            Err(e) => Notification::error(format!("Failed to remove duplicates: {}", e)),
        };
        self.emit(note)
    }

    pub async fn download(&mut self, options: &SearchQuery) -> Notification {
        let result = self.store.download(options).await;
        let note = match result {
            Ok(message) => {
                let reload = self.reload().await;
                self.mutation_done(message, reload)
            }
            Err(e) => Notification::error(format!("Failed to download papers: {}", e)),
        };
        self.emit(note)
    }

    pub async fn add_custom(&mut self, title: &str, content: &str) -> Notification {
        if title.trim().is_empty() || content.trim().is_empty() {
            return self.emit(Notification::error("Title and content are required"));
        }
        let result = self.store.add_custom(title, content).await;
        let note = match result {
            Ok(message) => {
                let reload = self.reload().await;
                self.mutation_done(message, reload)
            }
            Err(e) => Notification::error(format!("Failed to add paper: {}", e)),
        };
        self.emit(note)
    }

    pub async fn health(&self) -> Notification {
        let note = match self.store.health().await {
            Ok(status) => Notification::success(format!("Server status: {}", status)),
            Err(e) => Notification::error(format!("Health check failed: {}", e)),
        };
        self.emit(note)
    }
}
