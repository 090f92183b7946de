//! Pagination types shared by remote listings and local fallbacks

use serde::{Deserialize, Serialize};

/// Paginated response containing items and metadata
///
/// Pages are numbered from 1, matching the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: u64,
    /// Current page number (1-based)
    pub page: u32,
    /// Total number of pages
    pub total_pages: u32,
    /// Number of items per page
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Create a page whose `total_pages` is derived from `total`
    ///
    /// # Examples
    ///
    /// ```
    /// use core_library::pagination::Page;
    ///
    /// let page = Page::new(vec![1, 2, 3], 25, 1, 10);
    ///
    /// assert_eq!(page.items.len(), 3);
    /// assert_eq!(page.total, 25);
    /// assert_eq!(page.total_pages, 3);
    /// ```
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total,
            page,
            total_pages: total_pages_for(total, page_size),
            page_size,
        }
    }

    /// An empty page
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }

    /// Check if there are more pages after the current one
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Check if there are pages before the current one
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Map the items to a different type
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages,
            page_size: self.page_size,
        }
    }
}

/// `ceil(total / page_size)`, or 0 when the page size is 0
pub fn total_pages_for(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size as u64) as u32
    }
}

/// Slice an in-memory list the way the remote API pages it
///
/// Returns items `[(page-1)*size, page*size)`. Page 0 is treated as page 1.
pub fn paginate<T: Clone>(items: &[T], page: u32, page_size: u32) -> Page<T> {
    let page = page.max(1);
    let start = (page as usize - 1).saturating_mul(page_size as usize);
    let slice = items
        .iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect();

    Page::new(slice, items.len() as u64, page, page_size)
}
