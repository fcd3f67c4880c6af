//! Success envelope shared by every handler.
//!
//! Errors produce the same `{code, message}` shape from
//! [`AppError`](crate::error::AppError), so clients branch on `code` alone.

use npuwatch_core::pagination::PageInfo;
use serde::Serialize;

/// `{ "code": 200, "message": "success", "data": T }`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: 200,
            message: "success".to_string(),
            data,
        }
    }
}

/// `{ "items": [...], "pagination": {page, pageSize, total, totalPages} }`.
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}
