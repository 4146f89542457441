// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Axum middleware for metrics and request logging.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::error::REQUEST_ID_HEADER;
use crate::metrics::{determine_operation, record_request};

/// Metrics and logging middleware.
///
/// Wraps the request in an `http_request` span carrying a fresh request id,
/// records request metrics once the response is ready, and stamps the same id
/// on every response, errors included.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let operation = determine_operation(&method, &path);

    let span = info_span!(
        "http_request",
        request_id = %request_id,
        method = %method,
        path = %path,
        operation = operation.map(|o| o.as_str()).unwrap_or("unknown"),
    );

    let mut response = next.run(request).instrument(span).await;

    if let Some(op) = operation {
        record_request(op, response.status().as_u16(), start.elapsed());
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}
