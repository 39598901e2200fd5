//! Fixed-size pagination over newest-first post listings.

use serde::{Deserialize, Serialize};

pub const PAGE_SIZE: u64 = 10;

/// The clamped location of a page within a collection of known size.
///
/// Out-of-range requests clamp to the nearest valid page instead of erroring;
/// an empty collection still has exactly one (empty) page.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Pagination {
    number: u64,
    total_pages: u64,
}

impl Pagination {
    #[must_use]
    pub fn locate(total_items: u64, requested: u64) -> Self {
        let total_pages = total_items.div_ceil(PAGE_SIZE).max(1);

        Self {
            number: requested.clamp(1, total_pages),
            total_pages,
        }
    }

    #[must_use]
    pub fn number(self) -> u64 {
        self.number
    }

    #[must_use]
    pub fn total_pages(self) -> u64 {
        self.total_pages
    }

    #[must_use]
    pub fn offset(self) -> u64 {
        (self.number - 1) * PAGE_SIZE
    }

    #[must_use]
    pub fn has_next(self) -> bool {
        self.number < self.total_pages
    }

    #[must_use]
    pub fn has_previous(self) -> bool {
        self.number > 1
    }
}

/// A bounded slice of an ordered collection plus navigation metadata.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Assembles a page from items already sliced to `pagination`.
    #[must_use]
    pub fn assemble(items: Vec<T>, pagination: Pagination) -> Self {
        Self {
            items,
            number: pagination.number(),
            total_pages: pagination.total_pages(),
            has_next: pagination.has_next(),
            has_previous: pagination.has_previous(),
        }
    }

    /// Paginates an in-memory ordered sequence.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn slice(all: Vec<T>, requested: u64) -> Self {
        let pagination = Pagination::locate(all.len() as u64, requested);
        let items = all
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(PAGE_SIZE as usize)
            .collect();

        Self::assemble(items, pagination)
    }
}

#[cfg(test)]
mod tests {
    use crate::page::{PAGE_SIZE, Page, Pagination};

    #[test]
    fn thirteen_items_split_ten_three() {
        let first = Page::slice((0..13).collect::<Vec<_>>(), 1);
        assert_eq!(first.items, (0..10).collect::<Vec<_>>());
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next);
        assert!(!first.has_previous);

        let second = Page::slice((0..13).collect::<Vec<_>>(), 2);
        assert_eq!(second.items, (10..13).collect::<Vec<_>>());
        assert!(!second.has_next);
        assert!(second.has_previous);
    }

    #[test]
    fn out_of_range_requests_clamp() {
        assert_eq!(Pagination::locate(13, 0).number(), 1);
        assert_eq!(Pagination::locate(13, 99).number(), 2);
        assert_eq!(Pagination::locate(13, 2).offset(), PAGE_SIZE);

        let clamped = Page::slice((0..13).collect::<Vec<_>>(), 99);
        assert_eq!(clamped.number, 2);
        assert_eq!(clamped.items.len(), 3);
    }

    #[test]
    fn empty_collection_is_one_empty_page() {
        let page = Page::slice(Vec::<u8>::new(), 5);
        assert!(page.items.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next);
        assert!(!page.has_previous);
    }

    #[test]
    fn exact_multiple_has_no_trailing_page() {
        let pagination = Pagination::locate(20, 2);
        assert_eq!(pagination.total_pages(), 2);
        assert!(!pagination.has_next());
    }
}
