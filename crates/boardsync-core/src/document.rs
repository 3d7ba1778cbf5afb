//! The snapshot unit: every page plus the active page number.

use crate::element::{Element, PageNumber, Pages};
use serde::{Deserialize, Serialize};

/// Pages and the active page.
///
/// `pages` always holds at least one entry and `current_page` is always one of
/// its keys once a document has been produced by [`Document::new`] or a board
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub pages: Pages,
    pub current_page: PageNumber,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document with one empty page, page 1 active.
    pub fn new() -> Self {
        let mut pages = Pages::new();
        pages.insert(1, Vec::new());
        Self {
            pages,
            current_page: 1,
        }
    }

    pub fn page(&self, page: PageNumber) -> Option<&[Element]> {
        self.pages.get(&page).map(Vec::as_slice)
    }

    /// Mutable access to a page, creating it empty if missing.
    pub fn page_mut(&mut self, page: PageNumber) -> &mut Vec<Element> {
        self.pages.entry(page).or_default()
    }

    /// Elements of the active page.
    pub fn elements(&self) -> &[Element] {
        self.page(self.current_page).unwrap_or(&[])
    }

    pub fn lowest_page(&self) -> Option<PageNumber> {
        self.pages.keys().next().copied()
    }

    /// Whether any page holds an element with this id.
    pub fn contains_id(&self, id: &str) -> bool {
        self.pages.values().flatten().any(|e| e.id == id)
    }

    pub fn element_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Repair a document loaded from outside: at least one page, and the
    /// active page must exist.
    pub fn normalize(&mut self) {
        if self.pages.is_empty() {
            self.pages.insert(1, Vec::new());
        }
        if !self.pages.contains_key(&self.current_page) {
            self.current_page = self.lowest_page().unwrap_or(1);
        }
    }
}
