//! Generic list-view helper: one place for the search/paginate step every
//! entity list shares, parameterized by a match predicate and page size.

use serde::{Deserialize, Serialize};

/// Default page size when the client does not ask for one.
pub const DEFAULT_PER_PAGE: usize = 10;
/// Upper bound on requested page sizes.
pub const MAX_PER_PAGE: usize = 100;

/// Common query parameters of every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Free-text search, matched case-insensitively by the endpoint's predicate
    #[serde(default)]
    pub q: Option<String>,
    /// 1-based page number
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

/// One page of a filtered collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

/// Filter a fetched collection by the search term and slice out one page.
///
/// `matches` receives the lowercased search term and decides whether an item
/// stays in the view. Out-of-range page numbers clamp to the last page.
pub fn paginate<T>(
    items: Vec<T>,
    params: &ListParams,
    matches: impl Fn(&T, &str) -> bool,
) -> Page<T> {
    let filtered: Vec<T> = match params.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => {
            let q = q.to_lowercase();
            items.into_iter().filter(|item| matches(item, &q)).collect()
        }
        _ => items,
    };

    let per_page = params
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let total = filtered.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = params.page.unwrap_or(1).clamp(1, total_pages);

    let start = (page - 1) * per_page;
    let items = filtered
        .into_iter()
        .skip(start)
        .take(per_page)
        .collect();

    Page {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}
