//! Locally cached snapshot of the remote catalog.
//!
//! The cache holds the flat chunk list exactly as fetched (minus duplicate
//! hashes), sorted newest first. Every user-facing view is derived on demand
//! by pure functions:
//!
//! ```text
//! papers ──visible──▶ non-sentinel ──filter_by_title──▶ filtered
//!        ──group_by_title──▶ groups ──Pager──▶ current page
//! ```
//!
//! A failed [`load`](CatalogCache::load) leaves the previous snapshot in
//! place, so the view stays available while stale.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{CorpusError, CorpusResult};
use crate::models::{PaperChunk, PaperGroup};
use crate::pagination::{Navigation, PageControls, Pager, PAPERS_PER_PAGE_CHOICES};
use crate::store::PaperStore;

/// Chunks that belong in user-facing views.
pub fn visible(papers: &[PaperChunk]) -> Vec<&PaperChunk> {
    papers.iter().filter(|c| c.is_visible()).collect()
}

/// Case-insensitive substring match on title. An empty (or blank) filter
/// keeps everything.
pub fn filter_by_title<'a>(chunks: Vec<&'a PaperChunk>, filter: &str) -> Vec<&'a PaperChunk> {
    let needle = filter.trim().to_lowercase();
    if needle.is_empty() {
        return chunks;
    }
    chunks
        .into_iter()
        .filter(|c| c.title.to_lowercase().contains(&needle))
        .collect()
}

/// Group by exact title, in order of each title's first appearance.
pub fn group_by_title(chunks: &[&PaperChunk]) -> Vec<PaperGroup> {
    let mut groups: IndexMap<&str, Vec<PaperChunk>> = IndexMap::new();
    for chunk in chunks {
        groups
            .entry(chunk.title.as_str())
            .or_default()
            .push((*chunk).clone());
    }
    groups
        .into_iter()
        .map(|(title, chunks)| PaperGroup {
            title: title.to_string(),
            chunks,
        })
        .collect()
}

/// Newest `added_to_db` first; chunks without a usable timestamp go last.
/// Stable, so ties keep server order.
pub fn sort_by_recency(papers: &mut [PaperChunk]) {
    papers.sort_by(|a, b| b.added_at_millis().cmp(&a.added_at_millis()));
}

/// Drop repeated hashes, keeping the first occurrence. Returns how many
/// were dropped.
fn dedup_hashes(papers: &mut Vec<PaperChunk>) -> usize {
    let before = papers.len();
    let mut seen = HashSet::new();
    papers.retain(|c| seen.insert(c.hash.clone()));
    before - papers.len()
}

/// The catalog snapshot plus the title filter and group pager.
#[derive(Debug, Clone)]
pub struct CatalogCache {
    papers: Vec<PaperChunk>,
    hashes: HashSet<String>,
    title_filter: String,
    pager: Pager,
}

impl CatalogCache {
    pub fn new(papers_per_page: usize) -> Self {
        Self {
            papers: Vec::new(),
            hashes: HashSet::new(),
            title_filter: String::new(),
            pager: Pager::new(papers_per_page),
        }
    }

    /// Re-fetch the full catalog. On error nothing changes.
    pub async fn load(&mut self, store: &dyn PaperStore) -> CorpusResult<usize> {
        let papers = store.list_papers().await?;
        self.replace(papers);
        tracing::info!(chunks = self.papers.len(), "catalog loaded");
        Ok(self.papers.len())
    }

    /// Swap in a new snapshot.
    pub fn replace(&mut self, mut papers: Vec<PaperChunk>) {
        let dropped = dedup_hashes(&mut papers);
        if dropped > 0 {
            tracing::warn!(dropped, "catalog contained repeated hashes; kept first occurrence");
        }
        sort_by_recency(&mut papers);
        self.hashes = papers.iter().map(|c| c.hash.clone()).collect();
        self.papers = papers;

        let groups = self.group_count();
        if self.pager.page() > crate::pagination::total_pages(groups, self.pager.page_size()) {
            self.pager.reset();
        }
    }

    /// The full snapshot, sentinel chunks included.
    pub fn papers(&self) -> &[PaperChunk] {
        &self.papers
    }

    /// Whether a chunk with `hash` is in the snapshot.
    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    pub fn title_filter(&self) -> &str {
        &self.title_filter
    }

    /// Changing the filter changes the group list, so the pager resets.
    pub fn set_title_filter(&mut self, filter: &str) {
        if self.title_filter != filter {
            self.title_filter = filter.to_string();
            self.pager.reset();
        }
    }

    pub fn papers_per_page(&self) -> usize {
        self.pager.page_size()
    }

    /// Only the offered page sizes are accepted.
    pub fn set_papers_per_page(&mut self, n: usize) -> CorpusResult<()> {
        if !PAPERS_PER_PAGE_CHOICES.contains(&n) {
            return Err(CorpusError::InvalidSelection(format!(
                "papers per page must be one of {:?}",
                PAPERS_PER_PAGE_CHOICES
            )));
        }
        self.pager.set_page_size(n);
        Ok(())
    }

    pub fn visible(&self) -> Vec<&PaperChunk> {
        visible(&self.papers)
    }

    pub fn filtered(&self) -> Vec<&PaperChunk> {
        filter_by_title(self.visible(), &self.title_filter)
    }

    pub fn grouped(&self) -> Vec<PaperGroup> {
        group_by_title(&self.filtered())
    }

    pub fn group_count(&self) -> usize {
        let titles: HashSet<&str> = self.filtered().iter().map(|c| c.title.as_str()).collect();
        titles.len()
    }

    /// Groups on the current page.
    pub fn current_page(&self) -> Vec<PaperGroup> {
        self.pager.slice(&self.grouped()).to_vec()
    }

    pub fn page_controls(&self) -> PageControls {
        self.pager.controls(self.group_count())
    }

    pub fn go_to_page(&mut self, page: usize) -> Navigation {
        let n = self.group_count();
        self.pager.go_to(page, n)
    }

    pub fn next_page(&mut self) -> Navigation {
        let n = self.group_count();
        self.pager.next(n)
    }

    pub fn previous_page(&mut self) -> Navigation {
        let n = self.group_count();
        self.pager.previous(n)
    }
}
