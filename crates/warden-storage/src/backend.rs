// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Storage backend trait definition.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::Utc;
use md5::{Digest, Md5};
use uuid::Uuid;
use warden_core::{ListResult, MetadataUpdate, ObjectMetadata, Result, StoragePath};

/// Headers and metadata supplied with an upload.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Cache-Control header.
    pub cache_control: Option<String>,
    /// Content-Disposition header.
    pub content_disposition: Option<String>,
    /// Content-Encoding header.
    pub content_encoding: Option<String>,
    /// Content-Language header.
    pub content_language: Option<String>,
    /// User-defined key/value pairs.
    pub custom_metadata: BTreeMap<String, String>,
}

impl PutOptions {
    /// Options carrying only a content type.
    #[must_use]
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self { content_type: Some(content_type.into()), ..Default::default() }
    }
}

/// Trait for object storage backends.
///
/// Backends perform no access checks; callers gate every call.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `path`, replacing any existing object.
    async fn put_object(
        &self,
        path: &StoragePath,
        data: Bytes,
        options: PutOptions,
    ) -> Result<ObjectMetadata>;

    /// Metadata of the object at `path`, if one exists.
    async fn head_object(&self, path: &StoragePath) -> Result<Option<ObjectMetadata>>;

    /// Metadata and content of the object at `path`.
    async fn get_object(&self, path: &StoragePath) -> Result<(ObjectMetadata, Bytes)>;

    /// Objects and sub-directories directly below `prefix` (the root when `None`).
    async fn list(&self, prefix: Option<&StoragePath>) -> Result<ListResult>;

    /// Apply a partial metadata change to an existing object.
    async fn update_metadata(
        &self,
        path: &StoragePath,
        update: &MetadataUpdate,
    ) -> Result<ObjectMetadata>;

    /// Remove the object at `path`.
    async fn delete_object(&self, path: &StoragePath) -> Result<()>;

    /// Remove every object.
    async fn clear(&self) -> Result<()>;
}

/// Builds metadata for freshly written content.
///
/// Creation time and download tokens carry over from `previous` so that
/// overwriting an object keeps existing download URLs valid.
pub(crate) fn new_metadata(
    path: &StoragePath,
    data: &Bytes,
    options: PutOptions,
    generation: u64,
    previous: Option<&ObjectMetadata>,
) -> ObjectMetadata {
    let now = Utc::now();
    let mut hasher = Md5::new();
    hasher.update(data);
    let digest = hasher.finalize();

    ObjectMetadata {
        path: path.clone(),
        size: data.len() as u64,
        content_type: options.content_type,
        md5_hash: BASE64.encode(digest),
        generation,
        metageneration: 1,
        time_created: previous.map_or(now, |p| p.time_created),
        updated: now,
        cache_control: options.cache_control,
        content_disposition: options.content_disposition,
        content_encoding: options.content_encoding,
        content_language: options.content_language,
        custom_metadata: options.custom_metadata,
        download_tokens: previous
            .map(|p| p.download_tokens.clone())
            .filter(|tokens| !tokens.is_empty())
            .unwrap_or_else(|| vec![Uuid::new_v4().to_string()]),
    }
}

/// Applies `update` and bumps the metageneration.
pub(crate) fn updated_metadata(
    current: &ObjectMetadata,
    update: &MetadataUpdate,
) -> ObjectMetadata {
    let mut next = current.clone();
    next.apply(update);
    next.metageneration += 1;
    next.updated = Utc::now();
    next
}

/// Groups sorted keys into the direct children of `prefix`.
pub(crate) fn list_children<'a>(
    keys: impl Iterator<Item = &'a str>,
    prefix: Option<&StoragePath>,
) -> ListResult {
    let base = prefix.map(|p| format!("{}/", p.as_str())).unwrap_or_default();
    let mut prefixes = BTreeSet::new();
    let mut items = Vec::new();

    for key in keys {
        let Some(rest) = key.strip_prefix(base.as_str()) else {
            continue;
        };
        match rest.split_once('/') {
            Some((dir, _)) => {
                prefixes.insert(format!("{base}{dir}"));
            }
            None if !rest.is_empty() => items.push(key.to_string()),
            None => {}
        }
    }

    items.sort();
    ListResult { prefixes: prefixes.into_iter().collect(), items }
}
