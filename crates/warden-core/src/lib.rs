// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Core types and access rules for Warden.
//!
//! This crate provides the building blocks shared by every Warden component:
//! - Configuration management
//! - Error types with storage error codes
//! - Validated storage paths and object metadata
//! - The access rule chain that decides every request

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod path;
pub mod policy;
pub mod types;

pub use config::{
    AuthConfig, Config, LogFormat, LoggingConfig, MetricsConfig, RulesConfig, ServerConfig,
    StorageBackendKind, StorageConfig,
};
pub use error::{Error, ErrorCode, Result};
pub use path::StoragePath;
pub use policy::{
    AccessRequest, Actor, Condition, Operation, PathPattern, Payload, PolicyDecision, Rule,
    RuleSet,
};
pub use types::{ListResult, MetadataUpdate, ObjectMetadata};
