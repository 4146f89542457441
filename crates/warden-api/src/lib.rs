// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! HTTP API for Warden.
//!
//! This crate provides the HTTP layer including:
//! - bearer-token identity
//! - the rule gate in front of every store operation
//! - JSON error responses
//! - request metrics and tracing

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;

pub use error::ApiError;
pub use handlers::AppState;
pub use metrics::init_metrics;
pub use router::create_router;
