//! Page-based pagination for list operations.

use serde::{Deserialize, Serialize};

/// Default number of items per page.
pub const DEFAULT_PER_PAGE: u32 = 30;

/// Maximum number of items per page.
pub const MAX_PER_PAGE: u32 = 100;

/// Pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl Pagination {
    /// Create new pagination parameters, clamped to valid ranges.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Returns a copy clamped to valid ranges.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.page, self.per_page)
    }

    /// Number of items to skip.
    pub fn offset(&self) -> usize {
        let p = self.normalized();
        (p.page.saturating_sub(1) as usize) * p.per_page as usize
    }

    /// Maximum number of items to return.
    pub fn limit(&self) -> usize {
        self.normalized().per_page as usize
    }

    /// Slices an already ordered list into the requested page.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let p = self.normalized();
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.limit())
            .collect();
        Page {
            items,
            total,
            page: p.page,
            per_page: p.per_page,
        }
    }
}

/// One page of a list result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of matching items across all pages.
    pub total: usize,
    /// Page number (1-indexed).
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

impl<T> Page<T> {
    /// Returns true if more pages follow this one.
    pub fn has_next(&self) -> bool {
        (self.page as usize) * (self.per_page as usize) < self.total
    }

    /// Maps the items of the page.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}
