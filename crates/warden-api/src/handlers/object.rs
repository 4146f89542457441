// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Object operation handlers.
//!
//! Each handler runs the rule gate before the store does any work. Uploads
//! are checked twice: once before the body is read (against the declared
//! `Content-Length`, or an empty payload for chunked bodies), and again
//! against the bytes actually received.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{
    CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH,
    CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use tracing::info;
use warden_core::{
    Error as CoreError, ErrorCode, MetadataUpdate, ObjectMetadata, Operation, Payload, StoragePath,
};
use warden_storage::PutOptions;

use super::{parse_path, AppState};
use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::gate::{authorize, require_admin};

/// Prefix of request headers that become custom metadata.
pub const CUSTOM_METADATA_PREFIX: &str = "x-warden-meta-";

/// Query parameters for listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Directory to list. The root when absent.
    pub prefix: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    header_str(headers, &CONTENT_LENGTH).and_then(|v| v.trim().parse().ok())
}

fn extract_custom_metadata(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.as_str().strip_prefix(CUSTOM_METADATA_PREFIX)?;
            let value = value.to_str().ok()?;
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

fn put_options(headers: &HeaderMap) -> PutOptions {
    let owned = |name: &HeaderName| header_str(headers, name).map(String::from);
    PutOptions {
        content_type: owned(&CONTENT_TYPE),
        cache_control: owned(&CACHE_CONTROL),
        content_disposition: owned(&CONTENT_DISPOSITION),
        content_encoding: owned(&CONTENT_ENCODING),
        content_language: owned(&CONTENT_LANGUAGE),
        custom_metadata: extract_custom_metadata(headers),
    }
}

/// URL that serves the object's bytes to anyone holding the token.
#[must_use]
pub fn download_url(metadata: &ObjectMetadata) -> Option<String> {
    let token = metadata.download_tokens.first()?;
    Some(format!(
        "/download/{}?token={}",
        utf8_percent_encode(metadata.path.as_str(), NON_ALPHANUMERIC),
        utf8_percent_encode(token, NON_ALPHANUMERIC),
    ))
}

/// Upload an object (`PUT /o/{*path}`).
pub async fn upload(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let path = parse_path(&raw)?;
    let operation = match state.store.head_object(&path).await? {
        Some(_) => Operation::Update,
        None => Operation::Create,
    };
    let content_type = header_str(&headers, &CONTENT_TYPE);

    // Without a declared length, size conditions are checked against an empty
    // payload here. Every condition only gets harder to meet as size grows.
    let declared = declared_length(&headers);
    let early = Payload::new(declared.unwrap_or(0), content_type);
    authorize(&state.rules, &auth, &path, operation, Some(early))?;
    if declared.is_some_and(|len| len > state.body_limit() as u64) {
        return Err(too_large(&path));
    }

    let data = axum::body::to_bytes(body, state.body_limit())
        .await
        .map_err(|_| too_large(&path))?;

    authorize(
        &state.rules,
        &auth,
        &path,
        operation,
        Some(Payload::new(data.len() as u64, content_type)),
    )?;

    let metadata = state.store.put_object(&path, data, put_options(&headers)).await?;
    info!(
        path = %path,
        operation = %operation,
        size = metadata.size,
        generation = metadata.generation,
        "object uploaded"
    );

    let status = match operation {
        Operation::Create => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(metadata)).into_response())
}

fn too_large(path: &StoragePath) -> ApiError {
    ApiError::new(ErrorCode::EntityTooLarge, "Request body exceeds the server limit.")
        .with_resource(path.as_str())
}

/// Fetch metadata and a download URL (`GET /o/{*path}`).
pub async fn get_metadata(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let path = parse_path(&raw)?;
    authorize(&state.rules, &auth, &path, Operation::Read, None)?;

    let metadata =
        state.store.head_object(&path).await?.ok_or_else(|| CoreError::not_found(path.as_str()))?;

    let mut body = serde_json::to_value(&metadata).map_err(CoreError::from)?;
    if let (Some(url), Some(map)) = (download_url(&metadata), body.as_object_mut()) {
        map.insert("downloadUrl".to_string(), serde_json::Value::String(url));
    }
    Ok(Json(body).into_response())
}

/// Change object metadata (`PATCH /o/{*path}`).
///
/// The rules see the object as it would be after the change: current size
/// and the resulting content type.
pub async fn update_metadata(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let path = parse_path(&raw)?;
    let update: MetadataUpdate = serde_json::from_slice(&body).map_err(|e| {
        ApiError::new(ErrorCode::InvalidArgument, format!("Invalid metadata update: {e}"))
            .with_resource(path.as_str())
    })?;

    let current = state.store.head_object(&path).await?;
    let payload = current.as_ref().map(|m| {
        Payload::new(m.size, update.resulting_content_type(m.content_type.as_deref()))
    });
    authorize(&state.rules, &auth, &path, Operation::UpdateMetadata, payload)?;

    if current.is_none() {
        return Err(CoreError::not_found(path.as_str()).into());
    }
    let metadata = state.store.update_metadata(&path, &update).await?;
    info!(path = %path, metageneration = metadata.metageneration, "metadata updated");
    Ok(Json(metadata).into_response())
}

/// Delete an object (`DELETE /o/{*path}`).
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(raw): Path<String>,
) -> Result<Response, ApiError> {
    let path = parse_path(&raw)?;
    authorize(&state.rules, &auth, &path, Operation::Delete, None)?;

    state.store.delete_object(&path).await?;
    info!(path = %path, "object deleted");
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// List a directory (`GET /o?prefix=...`).
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let prefix = query.prefix.as_deref().map(|p| p.trim_matches('/')).filter(|p| !p.is_empty());

    let result = match prefix {
        Some(raw) => {
            let path = parse_path(raw)?;
            authorize(&state.rules, &auth, &path, Operation::List, None)?;
            state.store.list(Some(&path)).await?
        }
        None => {
            require_admin(&auth, Operation::List)?;
            state.store.list(None).await?
        }
    };

    Ok(Json(result).into_response())
}
