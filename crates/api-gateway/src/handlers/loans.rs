//! Loan calls.
//!
//! A GET with `isbn` asks for that book's loan history and ignores `ids`;
//! otherwise it lists the active loans of the users in `ids`. POST lends
//! (marks the loan active, stamping `loanTimestamp` when absent), PUT returns.

use super::{dispatch, parse_json_object, AppState};
use crate::domain::error::ApiResult;
use axum::extract::{Query, State};
use axum::response::Response;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use shared_envelope::format_timestamp;

const LOAN_TIMESTAMP: &str = "loanTimestamp";
const ACTIVE: &str = "active";

#[derive(Debug, Default, Deserialize)]
pub struct LoansQuery {
    pub isbn: Option<String>,
    pub ids: Option<String>,
}

pub fn list_command(query: &LoansQuery) -> Value {
    match &query.isbn {
        Some(isbn) => json!({ "command": "list_loan_history_by_isbn", "parameter": isbn }),
        None => json!({ "command": "list_active_books_user", "parameter": query.ids }),
    }
}

pub fn loan_command(mut loan: Map<String, Value>, now: DateTime<Utc>) -> Value {
    loan.insert(ACTIVE.into(), Value::Bool(true));
    if loan.get(LOAN_TIMESTAMP).map_or(true, is_unset_timestamp) {
        loan.insert(LOAN_TIMESTAMP.into(), Value::String(format_timestamp(now)));
    }
    json!({ "command": "loan", "loan": loan })
}

pub fn return_command(mut loan: Map<String, Value>) -> Value {
    loan.insert(ACTIVE.into(), Value::Bool(false));
    json!({ "command": "return", "loan": loan })
}

// Null, empty, or the zero date clients send for "no value".
fn is_unset_timestamp(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty() || s.starts_with("0001-01-01"),
        _ => false,
    }
}

/// `GET /api/loans`
pub async fn list_loans(
    State(state): State<AppState>,
    Query(query): Query<LoansQuery>,
) -> ApiResult<Response> {
    dispatch(&state, &state.services.loans, list_command(&query)).await
}

/// `POST /api/loans`
pub async fn lend_book(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let loan = parse_json_object(&body)?;
    let command = loan_command(loan, state.bridge.clock().now());
    dispatch(&state, &state.services.loans, command).await
}

/// `PUT /api/loans`
pub async fn return_book(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let loan = parse_json_object(&body)?;
    dispatch(&state, &state.services.loans, return_command(loan)).await
}
