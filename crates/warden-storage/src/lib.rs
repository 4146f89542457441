// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Object store backends for Warden.
//!
//! This crate provides:
//! - the [`ObjectStore`] trait every backend implements
//! - an in-memory store, the default for test environments
//! - a local filesystem store that survives restarts

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod local;
pub mod memory;

pub use backend::{ObjectStore, PutOptions};
pub use local::LocalStore;
pub use memory::MemoryStore;
