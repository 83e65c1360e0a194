//! Search orchestration: remote keyword queries reconciled with the local
//! catalog, plus the selection set used for batch adoption.
//!
//! The server ranks and pages results; the client only annotates each hit
//! with `exists_in_db` (its hash is in the current catalog snapshot) and
//! tracks which hits the user has selected.
//!
//! Selection rules:
//! - only hashes of current, not-yet-cataloged results can be selected;
//! - a new search or [`clear`](SearchSession::clear) empties the selection;
//! - a successful [`add_selected`](SearchSession::add_selected) reloads the
//!   catalog and clears results and selection.

use indexmap::IndexSet;

use crate::catalog::CatalogCache;
use crate::error::{CorpusError, CorpusResult};
use crate::models::{PaperChunk, SearchHit, SearchQuery};
use crate::store::PaperStore;

/// Remote offset for a 1-indexed search page.
pub fn start_index(search_page: usize, max_results: usize) -> usize {
    search_page.saturating_sub(1) * max_results
}

/// Mark each result with whether the catalog already holds its hash.
pub fn annotate(results: Vec<PaperChunk>, catalog: &CatalogCache) -> Vec<SearchHit> {
    results
        .into_iter()
        .map(|chunk| {
            let exists_in_db = catalog.contains(&chunk.hash);
            SearchHit {
                chunk,
                exists_in_db,
            }
        })
        .collect()
}

/// What the user typed into the search form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub max_results: usize,
    pub page: usize,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            page: 1,
            start_date: None,
            end_date: None,
        }
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn to_query(&self) -> SearchQuery {
        SearchQuery {
            query: self.query.clone(),
            max_results: self.max_results,
            start_index: start_index(self.page, self.max_results),
            start_date: self.start_date.clone().filter(|d| !d.is_empty()),
            end_date: self.end_date.clone().filter(|d| !d.is_empty()),
        }
    }
}

/// Results, selection and search-page cursor of one search panel.
#[derive(Debug, Clone)]
pub struct SearchSession {
    results: Vec<SearchHit>,
    selected: IndexSet<String>,
    page: usize,
    max_page: usize,
    active: bool,
}

impl SearchSession {
    pub fn new(max_page: usize) -> Self {
        Self {
            results: Vec::new(),
            selected: IndexSet::new(),
            page: 1,
            max_page: max_page.max(1),
            active: false,
        }
    }

    pub fn results(&self) -> &[SearchHit] {
        &self.results
    }

    /// Selected hashes in the order they were picked.
    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// True between a search and the next clear.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Set the page the next search will request.
    pub fn set_page(&mut self, page: usize) -> CorpusResult<()> {
        if page == 0 || page > self.max_page {
            return Err(CorpusError::InvalidSelection(format!(
                "search page must be between 1 and {}",
                self.max_page
            )));
        }
        self.page = page;
        Ok(())
    }

    /// Run a search. The selection is emptied before the request goes out;
    /// previous results survive a failed request.
    pub async fn search(
        &mut self,
        store: &dyn PaperStore,
        catalog: &CatalogCache,
        request: &SearchRequest,
    ) -> CorpusResult<usize> {
        self.set_page(request.page)?;
        self.selected.clear();
        self.active = true;

        let query = request.to_query();
        tracing::debug!(query = %query.query, start_index = query.start_index, "searching");
        let found = store.search(&query).await?;
        self.results = annotate(found, catalog);
        Ok(self.results.len())
    }

    /// Flip selection of `hash`; returns whether it is now selected.
    pub fn toggle_select(&mut self, hash: &str) -> CorpusResult<bool> {
        if self.selected.shift_remove(hash) {
            return Ok(false);
        }
        match self.results.iter().find(|h| h.chunk.hash == hash) {
            None => Err(CorpusError::InvalidSelection(format!(
                "{} is not in the current search results",
                hash
            ))),
            Some(hit) if hit.exists_in_db => Err(CorpusError::InvalidSelection(format!(
                "'{}' is already in the database",
                hit.chunk.title
            ))),
            Some(_) => {
                self.selected.insert(hash.to_string());
                Ok(true)
            }
        }
    }

    /// Submit the selection. On success the catalog is reloaded, then
    /// results and selection are cleared. A reload failure does not undo a
    /// successful add; it is returned alongside the server message.
    pub async fn add_selected(
        &mut self,
        store: &dyn PaperStore,
        catalog: &mut CatalogCache,
    ) -> CorpusResult<AddedSelection> {
        if self.selected.is_empty() {
            return Err(CorpusError::InvalidSelection(
                "Please select at least one paper".to_string(),
            ));
        }

        let hashes = self.selected();
        let message = store.add_selected(&hashes, &self.results).await?;
        tracing::info!(count = hashes.len(), "selected papers added");

        let reload_error = catalog.load(store).await.err();
        if let Some(e) = &reload_error {
            tracing::warn!(error = %e, "catalog reload after add failed");
        }

        self.results.clear();
        self.selected.clear();
        self.active = false;
        Ok(AddedSelection {
            message,
            count: hashes.len(),
            reload_error,
        })
    }

    /// Reset results, selection and page in one step.
    pub fn clear(&mut self) {
        self.results.clear();
        self.selected.clear();
        self.page = 1;
        self.active = false;
    }
}

/// Outcome of a successful add-selected.
#[derive(Debug)]
pub struct AddedSelection {
    pub message: String,
    pub count: usize,
    pub reload_error: Option<CorpusError>,
}
