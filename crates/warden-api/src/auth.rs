// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Bearer-token identity.
//!
//! Tokens are mock id tokens: the token text is the user id. The configured
//! admin token maps to [`AuthContext::Admin`], which skips rule evaluation.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;
use warden_core::{Actor, AuthConfig};

use crate::error::ApiError;

/// Who is behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// No `Authorization` header.
    Anonymous,
    /// A user token.
    User(String),
    /// The admin token. Rules are not evaluated.
    Admin,
}

impl AuthContext {
    /// Whether rules are bypassed.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// The actor the rules see, or `None` for the admin context.
    #[must_use]
    pub fn actor(&self) -> Option<Actor> {
        match self {
            Self::Anonymous => Some(Actor::Anonymous),
            Self::User(id) => Some(Actor::user(id.clone())),
            Self::Admin => None,
        }
    }
}

impl std::fmt::Display for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::User(id) => write!(f, "user:{id}"),
            Self::Admin => f.write_str("admin"),
        }
    }
}

/// State for the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthState {
    admin_token: Arc<str>,
}

impl AuthState {
    /// Create from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self { admin_token: Arc::from(config.admin_token.as_str()) }
    }

    /// Resolve the identity carried by `headers`.
    ///
    /// # Errors
    ///
    /// Returns `storage/unauthenticated` when an `Authorization` header is
    /// present but is not a non-empty bearer token.
    pub fn resolve(&self, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(AuthContext::Anonymous);
        };
        let value = value
            .to_str()
            .map_err(|_| ApiError::unauthenticated("Authorization header is not valid text."))?;

        let token = match value.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
            _ => return Err(ApiError::unauthenticated("Expected a Bearer token.")),
        };
        if token.is_empty() {
            return Err(ApiError::unauthenticated("Bearer token is empty."));
        }

        if token == &*self.admin_token {
            Ok(AuthContext::Admin)
        } else {
            Ok(AuthContext::User(token.to_string()))
        }
    }
}

/// Resolves the caller's identity and stores it as a request extension.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.resolve(request.headers()) {
        Ok(auth) => {
            debug!(auth = %auth, "resolved identity");
            request.extensions_mut().insert(auth);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}
