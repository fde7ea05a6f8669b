use axum::{Json, http::StatusCode};
use serde::Serialize;

use rishta_types::api::{Empty, Envelope, Pagination};
use rishta_db::models::Page;

pub type Reply<T> = (StatusCode, Json<Envelope<T>>);

pub fn ok<T: Serialize>(data: T) -> Reply<T> {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: None,
            data,
        }),
    )
}

pub fn ok_with<T: Serialize>(message: impl Into<String>, data: T) -> Reply<T> {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            message: Some(message.into()),
            data,
        }),
    )
}

pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Reply<T> {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            message: Some(message.into()),
            data,
        }),
    )
}

pub fn done(message: impl Into<String>) -> Reply<Empty> {
    ok_with(message, Empty {})
}

/// Clamped paging arguments from query values.
pub fn page(page: u32, limit: u32) -> Page {
    Page::new(page, limit)
}

pub fn pagination(page: Page, total: i64) -> Pagination {
    Pagination {
        page: page.page,
        limit: page.limit,
        total,
    }
}
