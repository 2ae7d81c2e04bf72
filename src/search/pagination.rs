//! Page arithmetic shared by browse and search mode.

use serde::Serialize;

use crate::models::PaginationInfo;

/// Pages shown on each side of the current page.
const WINDOW: u32 = 2;

/// One entry of the page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum PageLabel {
    Page(u32),
    Ellipsis,
}

impl std::fmt::Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page(n) => write!(f, "{n}"),
            Self::Ellipsis => f.write_str("…"),
        }
    }
}

/// First page, last page and ±2 around `current`, in ascending order, with
/// one ellipsis wherever pages are skipped.
pub fn page_labels(current: u32, total_pages: u32) -> Vec<PageLabel> {
    if total_pages == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total_pages);
    let start = current.saturating_sub(WINDOW).max(1);
    let end = current.saturating_add(WINDOW).min(total_pages);

    let mut pages = vec![1];
    pages.extend(start..=end);
    pages.push(total_pages);
    pages.sort_unstable();
    pages.dedup();

    let mut labels = Vec::with_capacity(pages.len() + 2);
    let mut previous = None;
    for page in pages {
        if previous.is_some_and(|prev| page > prev + 1) {
            labels.push(PageLabel::Ellipsis);
        }
        labels.push(PageLabel::Page(page));
        previous = Some(page);
    }
    labels
}

/// Whether `page` is a legal target. Anything outside `1..=total_pages` is
/// ignored by the controllers.
pub fn is_valid_page(page: u32, total_pages: u32) -> bool {
    page >= 1 && page <= total_pages
}

/// The items of `page` (1-based) when `items` is split into pages of `limit`.
pub fn slice_page<T>(items: &[T], page: u32, limit: u32) -> &[T] {
    let limit = limit.max(1) as usize;
    let start = (page.max(1) as usize - 1).saturating_mul(limit);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(limit).min(items.len());
    &items[start..end]
}

/// Pagination metadata for an in-memory result set.
pub fn local_pagination(total_items: usize, page: u32, limit: u32) -> PaginationInfo {
    let total = u32::try_from(total_items).unwrap_or(u32::MAX);
    PaginationInfo::compute(page, total, limit)
}
