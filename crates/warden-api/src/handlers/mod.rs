// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! API request handlers.

use std::sync::Arc;

use warden_core::{RuleSet, StoragePath};
use warden_storage::ObjectStore;

use crate::error::ApiError;

pub mod admin;
pub mod download;
pub mod object;

/// Application state shared by handlers.
#[derive(Clone)]
pub struct AppState {
    /// The object store.
    pub store: Arc<dyn ObjectStore>,
    /// Access rules, immutable after load.
    pub rules: Arc<RuleSet>,
    /// Largest accepted upload body in bytes (0 for unlimited).
    pub max_body_size: u64,
}

impl AppState {
    /// Create application state.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, rules: Arc<RuleSet>, max_body_size: u64) -> Self {
        Self { store, rules, max_body_size }
    }

    /// The upload body limit as a buffer length.
    #[must_use]
    pub fn body_limit(&self) -> usize {
        match self.max_body_size {
            0 => usize::MAX,
            n => usize::try_from(n).unwrap_or(usize::MAX),
        }
    }
}

/// Parse a path captured from the URL.
pub(crate) fn parse_path(raw: &str) -> Result<StoragePath, ApiError> {
    StoragePath::parse(raw).map_err(ApiError::from)
}
