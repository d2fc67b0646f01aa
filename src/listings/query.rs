//! Translation of list query parameters into a store-level filter, sort and page.

use serde::Serialize;

use super::repo_types::Category;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Predicates on top of the fixed public-visibility base
/// (`status = active AND is_verified`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub category: Option<Category>,
    /// Case-insensitive substring matched against service-area cities.
    pub city: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    RatingDesc,
    #[default]
    Newest,
    Oldest,
}

impl SortKey {
    /// Unknown keys fall back to `newest`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("price_asc") => SortKey::PriceAsc,
            Some("price_desc") => SortKey::PriceDesc,
            Some("rating_desc") => SortKey::RatingDesc,
            Some("oldest") => SortKey::Oldest,
            _ => SortKey::Newest,
        }
    }

    pub fn order_by(&self) -> &'static str {
        match self {
            SortKey::PriceAsc => "(pricing->>'amount')::float8 ASC, created_at DESC",
            SortKey::PriceDesc => "(pricing->>'amount')::float8 DESC, created_at DESC",
            SortKey::RatingDesc => "rating_average DESC, rating_count DESC, created_at DESC",
            SortKey::Newest => "created_at DESC",
            SortKey::Oldest => "created_at ASC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_services: u64,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// `total` counts non-featured matches only.
    pub fn new(page: PageRequest, total: u64) -> Self {
        let total_pages = total.div_ceil(page.limit as u64) as u32;
        Self {
            current_page: page.page,
            total_pages,
            total_services: total,
            limit: page.limit,
            has_next_page: page.page < total_pages,
            has_prev_page: page.page > 1,
        }
    }
}

/// Escapes `%`, `_` and `\` for use inside an ILIKE pattern.
pub fn like_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
