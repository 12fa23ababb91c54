//! Pagination utilities for the terminal views

/// Page window calculated from total rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: usize,
    /// Total number of pages
    pub total_pages: usize,
    /// Index of the first row on this page
    pub offset: usize,
    pub page_size: usize,
}

impl Pagination {
    /// Slice of `items` on this page
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.offset.min(items.len());
        let end = (self.offset + self.page_size).min(items.len());
        &items[start..end]
    }
}

/// Calculate pagination from total rows and requested page
///
/// Ensures page is within valid bounds [1, total_pages]
///
/// # Examples
/// ```
/// use rollcall_dashboard::pagination::calculate_pagination;
///
/// // 60 rows at 25 per page = 3 pages (25 + 25 + 10)
/// let p = calculate_pagination(60, 2, 25);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 25);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(60, 99, 25);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 50);
/// ```
pub fn calculate_pagination(total: usize, requested_page: usize, page_size: usize) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = total.div_ceil(page_size);
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        total_pages,
        offset,
        page_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(150, 0, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, 25);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
        assert!(p.slice::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(200, 2, 100);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_slice_last_partial_page() {
        let items: Vec<u32> = (0..7).collect();
        let p = calculate_pagination(items.len(), 3, 3);
        assert_eq!(p.slice(&items), &[6]);
    }
}
