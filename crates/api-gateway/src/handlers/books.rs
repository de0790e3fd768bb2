//! Book catalogue calls, answered by the books service.

use super::{dispatch, parse_json_object, AppState};
use crate::domain::error::ApiResult;
use axum::extract::{Query, State};
use axum::response::Response;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Default, Deserialize)]
pub struct BooksQuery {
    /// Comma-separated ISBN list, passed through as-is
    pub isbns: Option<String>,
}

pub fn list_command(isbns: Option<&str>) -> Value {
    json!({ "command": "list", "book": { "isbn": isbns } })
}

pub fn create_command(book: Map<String, Value>) -> Value {
    json!({ "command": "create", "book": book })
}

/// `GET /api/books`
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BooksQuery>,
) -> ApiResult<Response> {
    let command = list_command(query.isbns.as_deref());
    dispatch(&state, &state.services.books, command).await
}

/// `POST /api/books`
pub async fn create_book(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let book = parse_json_object(&body)?;
    dispatch(&state, &state.services.books, create_command(book)).await
}
