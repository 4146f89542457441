// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Token-gated downloads.
//!
//! Holding a download token is the capability: the access rules are not
//! consulted here.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH,
    CONTENT_TYPE, ETAG,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use serde::Deserialize;
use tracing::debug;
use warden_core::{ErrorCode, ObjectMetadata};

use super::{parse_path, AppState};
use crate::error::ApiError;

/// Query parameters for downloads.
#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Download token from the object's metadata.
    pub token: Option<String>,
}

/// Serve object bytes (`GET /download/{*path}?token=...`).
pub async fn download(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let path = parse_path(&raw)?;
    let (metadata, data) = state.store.get_object(&path).await?;

    let token = query.token.unwrap_or_default();
    if !metadata.accepts_download_token(&token) {
        debug!(path = %path, "download token rejected");
        return Err(ApiError::new(ErrorCode::Unauthorized, "Invalid download token.")
            .with_resource(path.as_str()));
    }

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_LENGTH, data.len())
        .header(ETAG, format!("\"{}\"", metadata.md5_hash));
    if let Some(headers) = response.headers_mut() {
        apply_object_headers(headers, &metadata);
    }

    response
        .body(Body::from(data))
        .map_err(|e| {
            ApiError::new(ErrorCode::InternalError, format!("Failed to build response: {e}"))
        })
}

fn apply_object_headers(headers: &mut axum::http::HeaderMap, metadata: &ObjectMetadata) {
    let content_type = metadata.content_type.as_deref().unwrap_or("application/octet-stream");
    let pairs = [
        (CONTENT_TYPE, Some(content_type)),
        (CACHE_CONTROL, metadata.cache_control.as_deref()),
        (CONTENT_DISPOSITION, metadata.content_disposition.as_deref()),
        (CONTENT_ENCODING, metadata.content_encoding.as_deref()),
        (CONTENT_LANGUAGE, metadata.content_language.as_deref()),
    ];
    for (name, value) in pairs {
        if let Some(value) = value.and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(name, value);
        }
    }
}
