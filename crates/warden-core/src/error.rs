// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Error types for Warden with storage-style error codes.

use thiserror::Error;

/// A specialized `Result` type for Warden operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage error codes surfaced to clients.
///
/// A denied request always maps to [`ErrorCode::Unauthorized`]; callers never
/// learn which rule refused them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request carried credentials that could not be understood.
    Unauthenticated,
    /// The access rules denied the request.
    Unauthorized,
    /// No object exists at the requested path.
    ObjectNotFound,
    /// The storage path is malformed.
    InvalidPath,
    /// A request argument is malformed.
    InvalidArgument,
    /// The request body exceeds the server limit.
    EntityTooLarge,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Unauthorized => 403,
            Self::ObjectNotFound => 404,
            Self::InvalidPath | Self::InvalidArgument => 400,
            Self::EntityTooLarge => 413,
            Self::InternalError => 500,
        }
    }

    /// Returns the HTTP status code as an `http::StatusCode`.
    #[must_use]
    pub fn status_code(&self) -> http::StatusCode {
        http::StatusCode::from_u16(self.http_status())
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the error code string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "storage/unauthenticated",
            Self::Unauthorized => "storage/unauthorized",
            Self::ObjectNotFound => "storage/object-not-found",
            Self::InvalidPath => "storage/invalid-path",
            Self::InvalidArgument => "storage/invalid-argument",
            Self::EntityTooLarge => "storage/entity-too-large",
            Self::InternalError => "storage/internal-error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during Warden operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A storage error with a specific error code.
    #[error("{code}: {message}")]
    Storage {
        /// The error code.
        code: ErrorCode,
        /// A human-readable error message.
        message: String,
        /// The storage path that caused the error, if any.
        resource: Option<String>,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding of persisted data failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Creates a new storage error.
    #[must_use]
    pub fn storage(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Storage { code, message: message.into(), resource: None }
    }

    /// Creates a new storage error naming the offending path.
    #[must_use]
    pub fn storage_with_resource(
        code: ErrorCode,
        message: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self::Storage { code, message: message.into(), resource: Some(resource.into()) }
    }

    /// Shorthand for a missing object at `path`.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::storage_with_resource(
            ErrorCode::ObjectNotFound,
            format!("Object '{path}' does not exist."),
            path,
        )
    }

    /// Returns the error code, if this is a storage error.
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Storage { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Storage { code, .. } => code.http_status(),
            Self::Config(_) | Self::InvalidRequest(_) => 400,
            Self::Io(_) | Self::Serialization(_) => 500,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
