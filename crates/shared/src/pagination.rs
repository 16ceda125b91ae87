//! Page-number pagination utilities.

use serde::Serialize;
use thiserror::Error;

/// Hard upper bound on page size accepted anywhere in the system.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Error type for page request construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Page must be at least 1")]
    PageOutOfRange,
    #[error("Page size must be between 1 and {max}")]
    PageSizeOutOfRange { max: u32 },
}

/// A validated page request.
///
/// Pages are 1-based. Construction fails instead of clamping; callers that
/// want lenient behaviour should use [`PageRequest::lenient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Creates a page request, rejecting out-of-range values.
    pub fn new(page: u32, page_size: u32, max_page_size: u32) -> Result<Self, PageError> {
        if page == 0 {
            return Err(PageError::PageOutOfRange);
        }
        if page_size == 0 || page_size > max_page_size {
            return Err(PageError::PageSizeOutOfRange {
                max: max_page_size,
            });
        }
        Ok(Self { page, page_size })
    }

    /// Creates a page request from raw user input, falling back to defaults
    /// and clamping the page size into `1..=max_page_size`.
    pub fn lenient(
        page: Option<i64>,
        page_size: Option<i64>,
        default_page_size: u32,
        max_page_size: u32,
    ) -> Self {
        let page = page
            .filter(|p| *p >= 1)
            .map(|p| p.min(u32::MAX as i64) as u32)
            .unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s >= 1)
            .map(|s| s.min(max_page_size as i64) as u32)
            .unwrap_or(default_page_size)
            .clamp(1, max_page_size.max(1));
        Self { page, page_size }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Zero-based row offset of the first item on this page.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    /// Number of rows to fetch for this page.
    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Number of pages needed to show `total` items, `page_size` per page.
///
/// Returns 0 when there is nothing to show.
pub fn total_pages(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_new_valid() {
        let req = PageRequest::new(3, 20, MAX_PAGE_SIZE).unwrap();
        assert_eq!(req.page(), 3);
        assert_eq!(req.page_size(), 20);
        assert_eq!(req.offset(), 40);
        assert_eq!(req.limit(), 20);
    }

    #[test]
    fn test_page_request_rejects_page_zero() {
        assert_eq!(
            PageRequest::new(0, 10, MAX_PAGE_SIZE),
            Err(PageError::PageOutOfRange)
        );
    }

    #[test]
    fn test_page_request_rejects_page_size_bounds() {
        assert!(PageRequest::new(1, 0, MAX_PAGE_SIZE).is_err());
        assert!(PageRequest::new(1, 101, MAX_PAGE_SIZE).is_err());
        assert!(PageRequest::new(1, 100, MAX_PAGE_SIZE).is_ok());
    }

    #[test]
    fn test_page_size_error_message() {
        let err = PageRequest::new(1, 500, 100).unwrap_err();
        assert_eq!(err.to_string(), "Page size must be between 1 and 100");
    }

    #[test]
    fn test_lenient_defaults() {
        let req = PageRequest::lenient(None, None, 10, 100);
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), 10);
    }

    #[test]
    fn test_lenient_clamps() {
        let req = PageRequest::lenient(Some(-4), Some(1000), 10, 100);
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), 100);

        let req = PageRequest::lenient(Some(2), Some(0), 25, 100);
        assert_eq!(req.page(), 2);
        assert_eq!(req.page_size(), 25);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(250, 100), 3);
    }

    #[test]
    fn test_default_page_request() {
        let req = PageRequest::default();
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);
    }
}
