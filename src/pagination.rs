use serde::{Deserialize, Serialize};

/// Page size used when the caller does not ask for one.
pub const DEFAULT_PER_PAGE: usize = 20;
/// Upper bound accepted for `page_size`.
pub const MAX_PER_PAGE: usize = 100;

fn get_pages(
    total_pages: usize,
    current_page: usize,
    left_edge: usize,
    left_current: usize,
    right_current: usize,
    right_edge: usize,
) -> Vec<Option<usize>> {
    let last_page = total_pages;

    if last_page == 0 {
        return vec![];
    }

    let mut pages = Vec::new();

    let left_end = (1 + left_edge).min(last_page + 1);
    pages.extend((1..left_end).map(Some));

    let mid_start = left_end.max(current_page.saturating_sub(left_current));
    let mid_end = (current_page + right_current + 1).min(last_page + 1);

    if mid_start > left_end {
        pages.push(None);
    }
    pages.extend((mid_start..mid_end).map(Some));

    let right_start = mid_end.max(last_page.saturating_sub(right_edge) + 1);

    if right_start > mid_end {
        pages.push(None);
    }
    pages.extend((right_start..=last_page).map(Some));

    pages
}

/// `?page=&page_size=` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl PageParams {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> usize {
        self.page_size
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

/// One page of a listing plus the navigation window for clients.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    /// Total number of pages.
    pub pages: usize,
    /// Compact page navigation, `null` marks a gap.
    pub page_window: Vec<Option<usize>>,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, current_page: usize, per_page: usize, total: usize) -> Self {
        let current_page = if current_page == 0 { 1 } else { current_page };
        let per_page = per_page.max(1);
        let total_pages = total.div_ceil(per_page);

        let page_window = get_pages(total_pages, current_page, 2, 2, 4, 2);

        Self {
            items,
            page: current_page,
            per_page,
            total,
            pages: total_pages,
            page_window,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            pages: self.pages,
            page_window: self.page_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_with_gaps() {
        let pages = get_pages(20, 10, 2, 2, 4, 2);
        assert_eq!(
            pages,
            vec![
                Some(1),
                Some(2),
                None,
                Some(8),
                Some(9),
                Some(10),
                Some(11),
                Some(12),
                Some(13),
                Some(14),
                None,
                Some(19),
                Some(20),
            ]
        );
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let page: Paginated<u8> = Paginated::new(vec![], 1, 20, 0);
        assert_eq!(page.pages, 0);
        assert!(page.page_window.is_empty());
    }

    #[test]
    fn totals_round_up() {
        let page = Paginated::new(vec![1, 2], 0, 20, 41);
        assert_eq!(page.page, 1);
        assert_eq!(page.pages, 3);
        assert_eq!(page.map(|n| n * 2).items, vec![2, 4]);
    }

    #[test]
    fn params_are_clamped() {
        let params = PageParams {
            page: Some(0),
            page_size: Some(1000),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);
        assert_eq!(PageParams::default().per_page(), DEFAULT_PER_PAGE);
    }
}
