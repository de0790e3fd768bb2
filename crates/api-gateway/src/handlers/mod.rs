//! Thin HTTP callers.
//!
//! Each handler builds one command body for one service, runs it through the
//! bridge and hands the reply body back untouched as `application/json`.
//!
//! | Route          | Method | Service | Command                                          |
//! |----------------|--------|---------|--------------------------------------------------|
//! | `/api/books`   | GET    | books   | `list` (`?isbns=`)                               |
//! | `/api/books`   | POST   | books   | `create`                                         |
//! | `/api/users`   | GET    | users   | `list` (`?ids=`)                                 |
//! | `/api/users`   | POST   | users   | `create`                                         |
//! | `/api/loans`   | GET    | loans   | `list_loan_history_by_isbn` / `list_active_books_user` |
//! | `/api/loans`   | POST   | loans   | `loan`                                           |
//! | `/api/loans`   | PUT    | loans   | `return`                                         |

pub mod books;
pub mod loans;
pub mod users;

use crate::domain::config::ServicesConfig;
use crate::domain::error::{ApiError, ApiResult};
use crate::ipc::RequestReplyBridge;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<RequestReplyBridge>,
    pub services: Arc<ServicesConfig>,
}

impl AppState {
    pub fn new(bridge: Arc<RequestReplyBridge>, services: ServicesConfig) -> Self {
        Self {
            bridge,
            services: Arc::new(services),
        }
    }
}

/// Send `command` to `destination` and relay the reply body.
pub(crate) async fn dispatch(
    state: &AppState,
    destination: &str,
    command: Value,
) -> ApiResult<Response> {
    let body = serde_json::to_vec(&command).map_err(|e| ApiError::internal(e.to_string()))?;
    debug!(
        destination,
        command = command["command"].as_str().unwrap_or("-"),
        "Dispatching command"
    );

    let reply = state.bridge.request(destination, body).await?;
    Ok(json_response(reply))
}

fn json_response(body: Bytes) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Parse a request body that must be a JSON object.
pub(crate) fn parse_json_object(body: &Bytes) -> ApiResult<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ApiError::bad_request(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ApiError::bad_request(format!("invalid JSON body: {e}"))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
