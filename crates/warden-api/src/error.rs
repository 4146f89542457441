// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! API error types and JSON error response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use warden_core::{Error as CoreError, ErrorCode};

/// Response header carrying the request id. Set by the metrics middleware,
/// which owns the id for the whole request.
pub const REQUEST_ID_HEADER: &str = "x-warden-request-id";

/// API-level error that can be converted to an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    /// Storage error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Object path that caused the error.
    pub resource: Option<String>,
}

impl ApiError {
    /// Create a new API error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), resource: None }
    }

    /// The single error every denied request gets.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(
            ErrorCode::Unauthorized,
            "User does not have permission to access this object.",
        )
    }

    /// Credentials were present but unusable.
    #[must_use]
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    /// Add resource information to the error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    /// Convert to the JSON error body.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "code": self.code.http_status(),
                "status": self.code.as_str(),
                "message": self.message,
            }
        })
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_json().to_string();

        (status, [("Content-Type", "application/json")], body).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Storage { code, message, resource } => {
                let mut api_err = ApiError::new(code, message);
                if let Some(r) = resource {
                    api_err = api_err.with_resource(r);
                }
                api_err
            }
            CoreError::Io(e) => {
                tracing::error!(error = %e, "storage I/O failure");
                ApiError::new(ErrorCode::InternalError, format!("I/O error: {e}"))
            }
            CoreError::Serialization(msg) => {
                ApiError::new(ErrorCode::InternalError, format!("Serialization error: {msg}"))
            }
            CoreError::Config(msg) => {
                ApiError::new(ErrorCode::InternalError, format!("Configuration error: {msg}"))
            }
            CoreError::InvalidRequest(msg) => ApiError::new(ErrorCode::InvalidArgument, msg),
        }
    }
}
