//! Page/limit handling shared by every listing endpoint.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

/// Raw query parameters as they arrive from the client. Both fields default
/// when absent; non-positive values are rejected rather than clamped.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn resolve(self) -> ApiResult<PageWindow> {
        let page = match self.page {
            None => DEFAULT_PAGE,
            Some(value) if value > 0 => value as u64,
            Some(value) => {
                return Err(ApiError::invalid(format!("page must be positive, got {value}")));
            }
        };
        let limit = match self.limit {
            None => DEFAULT_LIMIT,
            Some(value) if value > 0 => value as u64,
            Some(value) => {
                return Err(ApiError::invalid(format!(
                    "limit must be positive, got {value}"
                )));
            }
        };
        Ok(PageWindow { page, limit })
    }
}

/// A validated (page, limit) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Rows to skip before this page. Both factors are client-controlled, so
    /// absurdly large pages saturate instead of overflowing; the query then
    /// lands past the data and returns an empty page. Capped at `i64::MAX`
    /// so the value is always a valid SQLite integer.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.limit)
            .min(i64::MAX as u64)
    }
}

/// Pagination metadata echoed back to the client alongside the items.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub limit: u64,
}

impl Pagination {
    pub fn new(window: PageWindow, total_items: u64) -> Self {
        Self {
            current_page: window.page,
            total_pages: total_items.div_ceil(window.limit),
            total_items,
            limit: window.limit,
        }
    }
}

/// One page of results plus the metadata needed to fetch the rest.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total_items: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(window, total_items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_defaults() {
        let window = PageQuery::default().resolve().unwrap();
        assert_eq!(window, PageWindow { page: 1, limit: 10 });
        assert_eq!(window.offset(), 0);
    }

    #[test]
    fn resolve_rejects_non_positive_values() {
        let bad_page = PageQuery {
            page: Some(0),
            limit: None,
        };
        assert!(matches!(
            bad_page.resolve(),
            Err(ApiError::InvalidArgument(_))
        ));

        let bad_limit = PageQuery {
            page: None,
            limit: Some(-3),
        };
        assert!(matches!(
            bad_limit.resolve(),
            Err(ApiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn offset_skips_previous_pages() {
        let window = PageQuery {
            page: Some(3),
            limit: Some(7),
        }
        .resolve()
        .unwrap();
        assert_eq!(window.offset(), 14);
    }

    #[test]
    fn offset_saturates_on_huge_pages() {
        let window = PageQuery {
            page: Some(i64::MAX),
            limit: Some(i64::MAX),
        }
        .resolve()
        .unwrap();
        assert_eq!(window.offset(), i64::MAX as u64);
    }

    #[test]
    fn total_pages_rounds_up() {
        let window = PageWindow { page: 2, limit: 10 };
        let pagination = Pagination::new(window, 25);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.total_items, 25);
        assert_eq!(pagination.current_page, 2);
        assert_eq!(pagination.limit, 10);
    }

    #[test]
    fn empty_listing_has_zero_pages() {
        let pagination = Pagination::new(PageWindow { page: 1, limit: 10 }, 0);
        assert_eq!(pagination.total_pages, 0);
    }
}
