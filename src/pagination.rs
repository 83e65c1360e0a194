//! Two independent pagination axes over the grouped catalog.
//!
//! - **Group pages** ([`Pager`]): the ordered list of paper groups split
//!   into pages of `papers_per_page` groups.
//! - **Chunk pages** ([`ChunkCursors`]): one cursor per group title over
//!   that group's own chunks, fixed page size.
//!
//! Both use 1-indexed pages and `total_pages = ceil(n / size)`, which is 0
//! for an empty list. Navigation outside `1..=total_pages` is refused, not
//! clamped.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{PaperChunk, PaperGroup};

/// Group-page sizes offered to the user.
pub const PAPERS_PER_PAGE_CHOICES: [usize; 3] = [6, 12, 24];

/// Chunks shown per group page.
pub const CHUNKS_PER_PAGE: usize = 3;

pub fn total_pages(item_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    item_count.div_ceil(page_size)
}

/// The 1-indexed `page` of `items`. Empty when out of range.
pub fn page_slice<T>(items: &[T], page_size: usize, page: usize) -> &[T] {
    if page == 0 || page_size == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// State of the Previous/Next controls for one pager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageControls {
    pub page: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageControls {
    pub fn new(page: usize, total_pages: usize) -> Self {
        Self {
            page,
            total_pages,
            has_previous: total_pages > 0 && page > 1,
            has_next: page < total_pages,
        }
    }

    /// Both controls disabled.
    pub fn is_inert(&self) -> bool {
        !self.has_previous && !self.has_next
    }
}

/// Result of a group-page navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The page changed; the results viewport should scroll to the top.
    Moved { page: usize },
    /// Target outside `1..=total_pages`; nothing changed.
    Refused,
}

/// Cursor over the group list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Pager {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Changing the size invalidates page boundaries, so the cursor resets.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn controls(&self, item_count: usize) -> PageControls {
        PageControls::new(self.page, total_pages(item_count, self.page_size))
    }

    pub fn go_to(&mut self, target: usize, item_count: usize) -> Navigation {
        let total = total_pages(item_count, self.page_size);
        if target == 0 || target > total {
            return Navigation::Refused;
        }
        self.page = target;
        Navigation::Moved { page: target }
    }

    pub fn next(&mut self, item_count: usize) -> Navigation {
        if !self.controls(item_count).has_next {
            return Navigation::Refused;
        }
        self.go_to(self.page + 1, item_count)
    }

    pub fn previous(&mut self, item_count: usize) -> Navigation {
        if !self.controls(item_count).has_previous {
            return Navigation::Refused;
        }
        self.go_to(self.page - 1, item_count)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page_slice(items, self.page_size, self.page)
    }
}

/// Per-title chunk-page cursors.
///
/// Titles without an entry are on page 1. After a catalog reload,
/// [`retain_groups`](ChunkCursors::retain_groups) drops cursors of titles
/// that vanished and resets cursors that now point past their group's end.
#[derive(Debug, Clone, Default)]
pub struct ChunkCursors {
    cursors: HashMap<String, usize>,
    page_size: usize,
}

impl ChunkCursors {
    pub fn new(page_size: usize) -> Self {
        Self {
            cursors: HashMap::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_for(&self, title: &str) -> usize {
        self.cursors.get(title).copied().unwrap_or(1)
    }

    /// Chunk controls are only rendered when the group spans several pages.
    pub fn shows_controls(&self, chunk_count: usize) -> bool {
        chunk_count > self.page_size
    }

    pub fn controls(&self, title: &str, chunk_count: usize) -> PageControls {
        PageControls::new(
            self.page_for(title),
            total_pages(chunk_count, self.page_size),
        )
    }

    pub fn go_to(&mut self, title: &str, target: usize, chunk_count: usize) -> bool {
        if target == 0 || target > total_pages(chunk_count, self.page_size) {
            return false;
        }
        if target == 1 {
            self.cursors.remove(title);
        } else {
            self.cursors.insert(title.to_string(), target);
        }
        true
    }

    pub fn visible_chunks<'a>(&self, group: &'a PaperGroup) -> &'a [PaperChunk] {
        page_slice(&group.chunks, self.page_size, self.page_for(&group.title))
    }

    pub fn retain_groups(&mut self, groups: &[PaperGroup]) {
        let sizes: HashMap<&str, usize> = groups
            .iter()
            .map(|g| (g.title.as_str(), g.chunks.len()))
            .collect();
        let page_size = self.page_size;
        self.cursors.retain(|title, page| match sizes.get(title.as_str()) {
            Some(&n) => *page <= total_pages(n, page_size),
            None => false,
        });
    }

    pub fn tracked_titles(&self) -> HashSet<&str> {
        self.cursors.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(title: &str, n: usize) -> PaperGroup {
        PaperGroup {
            title: title.to_string(),
            chunks: (0..n)
                .map(|i| PaperChunk::new(format!("{}-{}", title, i), title, "text"))
                .collect(),
        }
    }

    #[test]
    fn totals_are_ceiling() {
        assert_eq!(total_pages(0, 6), 0);
        assert_eq!(total_pages(1, 6), 1);
        assert_eq!(total_pages(6, 6), 1);
        assert_eq!(total_pages(7, 6), 2);
        assert_eq!(total_pages(24, 12), 2);
        assert_eq!(total_pages(25, 12), 3);
        for n in 0..50 {
            for size in 1..10 {
                assert_eq!(total_pages(n, size), (n as f64 / size as f64).ceil() as usize);
            }
        }
    }

    #[test]
    fn empty_list_disables_everything() {
        let mut pager = Pager::new(6);
        let controls = pager.controls(0);
        assert_eq!(controls.total_pages, 0);
        assert!(controls.is_inert());
        assert_eq!(pager.next(0), Navigation::Refused);
        assert_eq!(pager.previous(0), Navigation::Refused);
        assert_eq!(pager.go_to(1, 0), Navigation::Refused);
    }

    #[test]
    fn guards_at_both_ends() {
        let mut pager = Pager::new(2);
        let c = pager.controls(5);
        assert_eq!(c.total_pages, 3);
        assert!(!c.has_previous && c.has_next);
        assert_eq!(pager.previous(5), Navigation::Refused);

        assert_eq!(pager.go_to(3, 5), Navigation::Moved { page: 3 });
        let c = pager.controls(5);
        assert!(c.has_previous && !c.has_next);
        assert_eq!(pager.next(5), Navigation::Refused);
        assert_eq!(pager.go_to(4, 5), Navigation::Refused);
        assert_eq!(pager.page(), 3);
    }

    #[test]
    fn resizing_resets_page() {
        let mut pager = Pager::new(6);
        pager.go_to(2, 13);
        pager.set_page_size(12);
        assert_eq!(pager.page(), 1);
    }

    #[test]
    fn slices_last_page_partially() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(page_slice(&items, 3, 3), &[7]);
        assert!(page_slice(&items, 3, 4).is_empty());
        assert!(page_slice(&items, 3, 0).is_empty());
    }

    #[test]
    fn chunk_cursors_are_independent_per_title() {
        let a = group("A", 7);
        let b = group("B", 2);
        let mut cursors = ChunkCursors::new(CHUNKS_PER_PAGE);

        assert!(cursors.shows_controls(a.chunks.len()));
        assert!(!cursors.shows_controls(b.chunks.len()));

        assert!(cursors.go_to("A", 3, a.chunks.len()));
        assert!(!cursors.go_to("A", 4, a.chunks.len()));
        assert_eq!(cursors.visible_chunks(&a).len(), 1);
        assert_eq!(cursors.visible_chunks(&b).len(), 2);
        assert_eq!(cursors.page_for("B"), 1);
    }

    #[test]
    fn retain_prunes_vanished_and_overflowing_cursors() {
        let mut cursors = ChunkCursors::new(3);
        cursors.go_to("kept", 2, 6);
        cursors.go_to("shrunk", 3, 9);
        cursors.go_to("gone", 2, 4);

        cursors.retain_groups(&[group("kept", 6), group("shrunk", 4)]);

        assert_eq!(cursors.page_for("kept"), 2);
        assert_eq!(cursors.page_for("shrunk"), 1);
        assert_eq!(cursors.tracked_titles(), HashSet::from(["kept"]));
    }
}
