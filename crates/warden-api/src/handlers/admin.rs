// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Admin and liveness endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;
use tracing::info;

use super::AppState;
use crate::auth::AuthContext;
use crate::error::ApiError;

/// `DELETE /admin/objects` - Remove every object.
///
/// Only the admin context may call this; it is how test environments reset
/// storage between cases.
pub async fn clear(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, ApiError> {
    if !auth.is_admin() {
        return Err(ApiError::unauthorized());
    }
    state.store.clear().await?;
    info!("storage cleared");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// `GET /health` - Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
