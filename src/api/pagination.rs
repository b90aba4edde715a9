//! Page-based pagination for list endpoints.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: u32 = 20;
const PER_PAGE_CAP: u32 = 100;

/// `?page=` and `?per_page=` query parameters, both optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// Requested page, 1-indexed. Zero is treated as the first page.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Requested page size, capped so a caller cannot ask for everything.
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, PER_PAGE_CAP)
    }

    /// Number of items preceding the requested page.
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.per_page()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

/// A page of results plus the metadata needed to fetch the rest.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, params: &PaginationParams, total_items: u64) -> Self {
        let per_page = params.per_page();
        let total_pages = total_items.div_ceil(per_page as u64) as u32;
        Self {
            data,
            pagination: PaginationMeta {
                page: params.page(),
                per_page,
                total_items,
                total_pages,
            },
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
