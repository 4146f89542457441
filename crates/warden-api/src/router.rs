// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! API router configuration.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get};
use axum::{middleware as axum_middleware, Router};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use warden_core::AuthConfig;

use crate::auth::{auth_middleware, AuthState};
use crate::handlers::{admin, download, object, AppState};
use crate::middleware::metrics_layer;

/// Create the API router.
///
/// # Arguments
/// * `state` - Store, rules and body limit shared by handlers
/// * `log_requests` - Whether to log HTTP requests
/// * `auth_config` - Admin token configuration
pub fn create_router(state: AppState, log_requests: bool, auth_config: &AuthConfig) -> Router {
    let max_body_size = state.max_body_size;

    let router = Router::new()
        .route("/health", get(admin::health))
        .route("/o", get(object::list))
        .route(
            "/o/{*path}",
            get(object::get_metadata)
                .put(object::upload)
                .patch(object::update_metadata)
                .delete(object::delete),
        )
        .route("/download/{*path}", get(download::download))
        .route("/admin/objects", delete(admin::clear))
        .with_state(state);

    let auth_state = AuthState::new(auth_config);
    let router = router.layer(axum_middleware::from_fn_with_state(auth_state, auth_middleware));

    let router = router.layer(axum_middleware::from_fn(metrics_layer));

    let router = if log_requests {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO));
        router.layer(trace_layer)
    } else {
        router
    };

    // 0 means unlimited
    if max_body_size > 0 {
        router.layer(DefaultBodyLimit::max(usize::try_from(max_body_size).unwrap_or(usize::MAX)))
    } else {
        router.layer(DefaultBodyLimit::disable())
    }
}
