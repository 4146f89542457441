// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Rule evaluation for API handlers.
//!
//! Every handler that touches the store calls [`authorize`] first. The admin
//! context skips the rules; everyone else gets a decision from the
//! [`RuleSet`], and a deny becomes a 403 with no reason attached.

use tracing::debug;
use warden_core::{AccessRequest, Operation, Payload, RuleSet, StoragePath};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::metrics::record_decision;

/// Check whether `auth` may perform `operation` on `path`.
///
/// # Errors
///
/// Returns `storage/unauthorized` if the rules deny the request.
pub fn authorize(
    rules: &RuleSet,
    auth: &AuthContext,
    path: &StoragePath,
    operation: Operation,
    payload: Option<Payload>,
) -> Result<(), ApiError> {
    let Some(actor) = auth.actor() else {
        record_decision(operation, None);
        return Ok(());
    };

    let mut request = AccessRequest::new(actor, path.clone(), operation);
    if let Some(payload) = payload {
        request = request.with_payload(payload);
    }

    let decision = rules.evaluate(&request);
    record_decision(operation, Some(decision));

    if decision.is_allowed() {
        Ok(())
    } else {
        debug!(
            actor = %request.actor,
            operation = %operation,
            path = %path,
            "request denied"
        );
        Err(ApiError::unauthorized().with_resource(path.as_str()))
    }
}

/// Operations with no path (listing the root) are reserved for the admin.
///
/// # Errors
///
/// Returns `storage/unauthorized` for any non-admin context.
pub fn require_admin(auth: &AuthContext, operation: Operation) -> Result<(), ApiError> {
    if auth.is_admin() {
        record_decision(operation, None);
        Ok(())
    } else {
        record_decision(operation, Some(warden_core::PolicyDecision::Deny));
        Err(ApiError::unauthorized())
    }
}
