// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Validated object paths.

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode, Result};

/// Maximum length of a storage path in bytes.
pub const MAX_PATH_LEN: usize = 1024;

/// A normalized, `/`-separated object path such as `users/alice/icon.png`.
///
/// Leading and trailing slashes are stripped on parse. Empty, `.` and `..`
/// segments are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoragePath(String);

impl StoragePath {
    /// Parses and validates a storage path.
    ///
    /// # Errors
    ///
    /// Returns `storage/invalid-path` if the path is empty, too long, or
    /// contains an empty, `.` or `..` segment.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(invalid(raw, "path must not be empty"));
        }
        if trimmed.len() > MAX_PATH_LEN {
            return Err(invalid(raw, "path exceeds 1024 bytes"));
        }
        for segment in trimmed.split('/') {
            match segment {
                "" => return Err(invalid(raw, "path contains an empty segment")),
                "." | ".." => return Err(invalid(raw, "relative segments are not allowed")),
                s if s.chars().any(char::is_control) => {
                    return Err(invalid(raw, "path contains control characters"))
                }
                _ => {}
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments in the path.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The final segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The text after the last `.` of the final segment, if any.
    ///
    /// A leading dot (`.hidden`) does not start an extension.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// The path without its final segment.
    #[must_use]
    pub fn parent(&self) -> Option<StoragePath> {
        self.0.rsplit_once('/').map(|(parent, _)| Self(parent.to_string()))
    }

    /// Appends a relative path.
    ///
    /// # Errors
    ///
    /// Returns `storage/invalid-path` if the combined path is invalid.
    pub fn child(&self, relative: &str) -> Result<StoragePath> {
        Self::parse(&format!("{}/{}", self.0, relative.trim_matches('/')))
    }
}

fn invalid(raw: &str, reason: &str) -> Error {
    Error::storage_with_resource(
        ErrorCode::InvalidPath,
        format!("Invalid path '{raw}': {reason}"),
        raw.to_string(),
    )
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StoragePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<StoragePath> for String {
    fn from(path: StoragePath) -> Self {
        path.0
    }
}

impl std::str::FromStr for StoragePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
