// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Common types used throughout Warden.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::path::StoragePath;

/// Metadata for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// Full object path.
    pub path: StoragePath,
    /// Object size in bytes.
    pub size: u64,
    /// Content type (MIME type).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Base64-encoded MD5 of the content.
    pub md5_hash: String,
    /// Store-wide counter bumped on every content write.
    pub generation: u64,
    /// Bumped on every metadata change of this object.
    pub metageneration: u64,
    /// When the object was first created.
    pub time_created: DateTime<Utc>,
    /// When the object or its metadata last changed.
    pub updated: DateTime<Utc>,
    /// Cache-Control header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    /// Content-Disposition header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// Content-Encoding header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// Content-Language header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    /// User-defined key/value pairs.
    #[serde(default)]
    pub custom_metadata: BTreeMap<String, String>,
    /// Secrets that grant byte download without rule evaluation.
    #[serde(default)]
    pub download_tokens: Vec<String>,
}

impl ObjectMetadata {
    /// The object's file name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.file_name()
    }

    /// Whether `token` is one of this object's download tokens.
    #[must_use]
    pub fn accepts_download_token(&self, token: &str) -> bool {
        !token.is_empty() && self.download_tokens.iter().any(|t| t == token)
    }

    /// Applies a metadata update in place.
    pub fn apply(&mut self, update: &MetadataUpdate) {
        if let Some(v) = &update.content_type {
            self.content_type = v.clone();
        }
        if let Some(v) = &update.cache_control {
            self.cache_control = v.clone();
        }
        if let Some(v) = &update.content_disposition {
            self.content_disposition = v.clone();
        }
        if let Some(v) = &update.content_encoding {
            self.content_encoding = v.clone();
        }
        if let Some(v) = &update.content_language {
            self.content_language = v.clone();
        }
        for (key, value) in &update.custom_metadata {
            match value {
                Some(v) => {
                    self.custom_metadata.insert(key.clone(), v.clone());
                }
                None => {
                    self.custom_metadata.remove(key);
                }
            }
        }
    }
}

/// A partial metadata change.
///
/// For every field, absent means "leave as is" and `null` means "clear".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataUpdate {
    /// New content type.
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Option<String>>,
    /// New Cache-Control value.
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<Option<String>>,
    /// New Content-Disposition value.
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<Option<String>>,
    /// New Content-Encoding value.
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<Option<String>>,
    /// New Content-Language value.
    #[serde(with = "double_option", skip_serializing_if = "Option::is_none")]
    pub content_language: Option<Option<String>>,
    /// Custom metadata entries to set (`Some`) or remove (`None`).
    pub custom_metadata: BTreeMap<String, Option<String>>,
}

impl MetadataUpdate {
    /// The content type the object will have once `self` is applied.
    #[must_use]
    pub fn resulting_content_type<'a>(&'a self, current: Option<&'a str>) -> Option<&'a str> {
        match &self.content_type {
            Some(v) => v.as_deref(),
            None => current,
        }
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}

/// The result of listing a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResult {
    /// Sub-directories directly below the listed prefix.
    pub prefixes: Vec<String>,
    /// Objects directly below the listed prefix.
    pub items: Vec<String>,
}
