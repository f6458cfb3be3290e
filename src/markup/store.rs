//! Per-page markup store
//!
//! One ordered sequence of primitives per page; insertion order is z-order
//! is undo order. Append and pop-last are the only mutations during
//! drawing - correction is undo-then-redraw, never in-place edits.

use std::collections::BTreeMap;

use crate::error::InvalidMarkupError;
use crate::markup::MarkupPrimitive;

/// Mapping from page index to that page's committed primitives.
#[derive(Debug, Default)]
pub struct MarkupStore {
    pages: BTreeMap<usize, Vec<MarkupPrimitive>>,
}

impl MarkupStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a primitive to a page. Invalid primitives are
    /// rejected and never stored.
    pub fn append(
        &mut self,
        page: usize,
        primitive: MarkupPrimitive,
    ) -> Result<(), InvalidMarkupError> {
        primitive.validate()?;
        log::debug!(
            "markup: append {} on page {page}",
            primitive.kind_name()
        );
        self.pages.entry(page).or_default().push(primitive);
        Ok(())
    }

    /// Remove and return the most recent primitive on a page. No-op on a
    /// page with no markup.
    pub fn pop_last(&mut self, page: usize) -> Option<MarkupPrimitive> {
        let seq = self.pages.get_mut(&page)?;
        let popped = seq.pop();
        if seq.is_empty() {
            self.pages.remove(&page);
        }
        popped
    }

    /// Remove all markup on one page.
    pub fn clear_page(&mut self, page: usize) {
        self.pages.remove(&page);
    }

    /// Remove all markup on every page.
    pub fn clear_all(&mut self) {
        self.pages.clear();
    }

    /// Committed primitives for a page, in insertion order.
    #[must_use]
    pub fn get(&self, page: usize) -> &[MarkupPrimitive] {
        self.pages.get(&page).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn has_markup(&self, page: usize) -> bool {
        self.pages.get(&page).is_some_and(|seq| !seq.is_empty())
    }

    /// Total primitives across all pages.
    #[must_use]
    pub fn count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    /// Pages that carry markup, ascending.
    pub fn marked_pages(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages
            .iter()
            .filter(|(_, seq)| !seq.is_empty())
            .map(|(&page, _)| page)
    }
}
