//! Pagination types shared by every list endpoint

use crate::error::{api_success_with_meta, ApiResponse, PaginationInfo, ResponseMetadata};
use serde::Deserialize;
use utoipa::IntoParams;

/// Standard pagination parameters for list endpoints
#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    #[param(example = 1, minimum = 1)]
    pub page: Option<u32>,

    #[param(example = 20, minimum = 1, maximum = 100)]
    pub page_size: Option<u32>,
}

impl PaginationParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Get the page number (defaults to 1, minimum 1)
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Get the page size (defaults to 20, clamped between 1 and 100)
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(20).clamp(1, 100)
    }

    /// Row offset of the first item on this page
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.page_size())
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size())
    }

    /// Calculate total pages given a total count
    pub fn total_pages(&self, total_count: u64) -> u32 {
        if total_count == 0 {
            return 1;
        }
        let pages = total_count.div_ceil(u64::from(self.page_size()));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// Create response metadata with pagination info
    pub fn to_metadata(&self, total_count: u64) -> ResponseMetadata {
        let total_pages = self.total_pages(total_count);

        ResponseMetadata {
            pagination: Some(PaginationInfo {
                page: self.page(),
                page_size: self.page_size(),
                total_pages,
                has_next: self.page() < total_pages,
                has_previous: self.page() > 1,
            }),
            total_count: Some(total_count),
        }
    }

    /// Wrap data with pagination metadata
    pub fn wrap_response<T>(&self, data: T, total_count: u64) -> ApiResponse<T> {
        api_success_with_meta(data, self.to_metadata(total_count))
    }
}

/// Slice one page out of an already filtered and ordered list
pub fn page_of<T>(items: Vec<T>, limit: i64, offset: i64) -> (Vec<T>, u64) {
    let total = items.len() as u64;
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let take = usize::try_from(limit).unwrap_or(0);
    (items.into_iter().skip(skip).take(take).collect(), total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams { page: None, page_size: None };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_pagination_clamps() {
        let params = PaginationParams { page: Some(0), page_size: Some(500) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 100);

        let params = PaginationParams { page: Some(2), page_size: Some(0) };
        assert_eq!(params.page_size(), 1);
    }

    #[test]
    fn test_pagination_offset() {
        let params = PaginationParams::new(3, 10);
        assert_eq!(params.offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        let params = PaginationParams::new(1, 20);
        assert_eq!(params.total_pages(100), 5);
        assert_eq!(params.total_pages(101), 6);
        assert_eq!(params.total_pages(0), 1);
    }

    #[test]
    fn test_metadata_flags() {
        let meta = PaginationParams::new(2, 10).to_metadata(25);
        let pagination = meta.pagination.unwrap();
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next);
        assert!(pagination.has_previous);
        assert_eq!(meta.total_count, Some(25));
    }

    #[test]
    fn test_page_of() {
        let (items, total) = page_of((1..=7).collect::<Vec<_>>(), 3, 3);
        assert_eq!(items, vec![4, 5, 6]);
        assert_eq!(total, 7);
    }
}
