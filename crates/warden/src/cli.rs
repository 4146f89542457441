// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Command line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use warden_core::Operation;

/// Warden: rule-gated object storage for per-user images.
#[derive(Parser)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start the server.
    Serve(ServeArgs),
    /// Evaluate the access rules for a single request and print the decision.
    Check(CheckArgs),
    /// Print version information.
    Version,
}

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (overrides config).
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,

    /// Persist objects under this directory (selects the local backend).
    #[arg(short, long)]
    pub data_dir: Option<PathBuf>,

    /// Rules file replacing the built-in rules.
    #[arg(short, long)]
    pub rules: Option<PathBuf>,
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Object path (or directory for `list`).
    #[arg(short, long)]
    pub path: String,

    /// Operation: read, list, create, update, update_metadata or delete.
    #[arg(short, long)]
    pub op: Operation,

    /// Authenticated user id. Omit for an anonymous request.
    #[arg(short, long)]
    pub user: Option<String>,

    /// Payload size in bytes for write operations.
    #[arg(short, long)]
    pub size: Option<u64>,

    /// Declared content type for write operations.
    #[arg(short = 't', long)]
    pub content_type: Option<String>,

    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rules file replacing the built-in rules.
    #[arg(short, long)]
    pub rules: Option<PathBuf>,
}
