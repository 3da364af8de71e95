use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: usize = 5;
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl PageQuery {
    /// 1-based page, never zero.
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> usize {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub items_per_page: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Slices `items` into the requested page. Pages past the end are empty.
pub fn paginate<T>(items: Vec<T>, query: &PageQuery) -> Page<T> {
    let page = query.page();
    let per_page = query.per_page();
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);

    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    Page {
        items,
        pagination: PaginationMeta {
            current_page: page,
            total_pages,
            total_items,
            items_per_page: per_page,
        },
    }
}
