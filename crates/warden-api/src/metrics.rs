// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! API metrics definitions.
//!
//! Prometheus-compatible counters and histograms for requests and rule
//! decisions. Nothing is exported unless the binary installs a recorder.

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use warden_core::{Operation, PolicyDecision};

/// API route kind for metrics labeling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    /// Upload an object.
    Upload,
    /// Fetch object metadata and download URL.
    GetMetadata,
    /// Patch object metadata.
    UpdateMetadata,
    /// Delete an object.
    Delete,
    /// List a directory.
    List,
    /// Token-gated byte download.
    Download,
    /// Admin clear.
    Clear,
    /// Liveness probe.
    Health,
}

impl ApiOperation {
    /// Returns the operation name as a string for metric labels.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "Upload",
            Self::GetMetadata => "GetMetadata",
            Self::UpdateMetadata => "UpdateMetadata",
            Self::Delete => "Delete",
            Self::List => "List",
            Self::Download => "Download",
            Self::Clear => "Clear",
            Self::Health => "Health",
        }
    }
}

/// Initialize metric descriptions (call once at startup).
pub fn init_metrics() {
    describe_counter!("warden_requests_total", "Total number of API requests");
    describe_histogram!("warden_request_duration_seconds", "Request duration in seconds");
    describe_counter!(
        "warden_policy_decisions_total",
        "Access rule decisions by operation and outcome"
    );
}

/// Record a completed request.
pub fn record_request(operation: ApiOperation, status_code: u16, duration: Duration) {
    let op = operation.as_str();
    let status = status_class(status_code);
    let success = if status_code < 400 { "true" } else { "false" };

    counter!("warden_requests_total",
        "operation" => op,
        "status" => status,
        "success" => success
    )
    .increment(1);

    histogram!("warden_request_duration_seconds",
        "operation" => op,
        "status" => status
    )
    .record(duration.as_secs_f64());
}

/// Record a rule decision. Admin requests are recorded as `bypass`.
pub fn record_decision(operation: Operation, decision: Option<PolicyDecision>) {
    let outcome = decision.map_or("bypass", |d| d.as_str());
    counter!("warden_policy_decisions_total",
        "operation" => operation.as_str(),
        "decision" => outcome
    )
    .increment(1);
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

/// Determine the route kind from HTTP method and path.
#[must_use]
pub fn determine_operation(method: &http::Method, path: &str) -> Option<ApiOperation> {
    let is_object = path.starts_with("/o/");
    let is_listing = path == "/o" || path == "/o/";

    match *method {
        http::Method::PUT if is_object => Some(ApiOperation::Upload),
        http::Method::GET if is_listing => Some(ApiOperation::List),
        http::Method::GET if is_object => Some(ApiOperation::GetMetadata),
        http::Method::PATCH if is_object => Some(ApiOperation::UpdateMetadata),
        http::Method::DELETE if is_object => Some(ApiOperation::Delete),
        http::Method::GET if path.starts_with("/download/") => Some(ApiOperation::Download),
        http::Method::DELETE if path == "/admin/objects" => Some(ApiOperation::Clear),
        http::Method::GET if path == "/health" => Some(ApiOperation::Health),
        _ => None,
    }
}
