//! User registry calls.

use super::{dispatch, parse_json_object, AppState};
use crate::domain::error::ApiResult;
use axum::extract::{Query, State};
use axum::response::Response;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub ids: Option<String>,
}

pub fn list_command(ids: Option<&str>) -> Value {
    json!({ "command": "list", "parameter": ids })
}

pub fn create_command(user: Map<String, Value>) -> Value {
    json!({ "command": "create", "user": user })
}

/// `GET /api/users`
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> ApiResult<Response> {
    let command = list_command(query.ids.as_deref());
    dispatch(&state, &state.services.users, command).await
}

/// `POST /api/users`
pub async fn create_user(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let user = parse_json_object(&body)?;
    dispatch(&state, &state.services.users, create_command(user)).await
}
