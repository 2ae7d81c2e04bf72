use serde::{Deserialize, Serialize};

/// Pagination metadata, either reported by the server (browse mode)
/// or computed locally over an in-memory result set (search mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u32,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationInfo {
    /// Derive metadata for `total_items` split into pages of `limit`.
    pub fn compute(current_page: u32, total_items: u32, limit: u32) -> Self {
        let limit = limit.max(1);
        let total_pages = total_items.div_ceil(limit);
        Self {
            current_page,
            total_pages,
            total_items,
            limit,
            has_next_page: current_page < total_pages,
            has_prev_page: current_page > 1,
        }
    }

    /// Everything on one page, for responses that carry no pagination.
    pub fn single_page(len: usize, limit: u32) -> Self {
        let total_items = u32::try_from(len).unwrap_or(u32::MAX);
        Self {
            current_page: 1,
            total_pages: u32::from(total_items > 0),
            total_items,
            limit: limit.max(1),
            has_next_page: false,
            has_prev_page: false,
        }
    }

    /// Metadata for an empty listing.
    pub fn empty(limit: u32) -> Self {
        Self::compute(1, 0, limit)
    }
}

/// One server page of records.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_rounds_pages_up() {
        let info = PaginationInfo::compute(1, 21, 10);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next_page);
        assert!(!info.has_prev_page);
    }

    #[test]
    fn last_page_has_no_next() {
        let info = PaginationInfo::compute(3, 21, 10);
        assert!(!info.has_next_page);
        assert!(info.has_prev_page);
    }

    #[test]
    fn empty_has_zero_pages() {
        let info = PaginationInfo::empty(10);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next_page);
        assert!(!info.has_prev_page);
    }

    #[test]
    fn single_page_never_has_neighbours() {
        let info = PaginationInfo::single_page(37, 10);
        assert_eq!(info.total_pages, 1);
        assert_eq!(info.total_items, 37);
        assert!(!info.has_next_page);
        assert_eq!(PaginationInfo::single_page(0, 10).total_pages, 0);
    }

    #[test]
    fn deserializes_server_pagination() {
        let info: PaginationInfo = serde_json::from_str(
            r#"{"currentPage":2,"totalPages":5,"totalItems":48,"limit":10,"hasNextPage":true,"hasPrevPage":true}"#,
        )
        .unwrap();
        assert_eq!(info.current_page, 2);
        assert_eq!(info.total_items, 48);
    }
}
