// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-user image rule tests.

pub mod create;
pub mod get;
pub mod list;
pub mod update;
