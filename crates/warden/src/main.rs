// Copyright 2024 The Warden Authors
// SPDX-License-Identifier: Apache-2.0

//! Warden: rule-gated object storage for per-user images.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use warden_api::metrics::init_metrics;
use warden_api::{create_router, AppState};
use warden_core::{
    AccessRequest, Actor, Config, LogFormat, Payload, PolicyDecision, StorageBackendKind,
    StoragePath,
};
use warden_storage::{LocalStore, MemoryStore, ObjectStore};

mod cli;

use cli::{CheckArgs, Cli, Commands, ServeArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => run_server(args).await.map(|()| ExitCode::SUCCESS),
        Commands::Check(args) => {
            let decision = run_check(&args)?;
            println!("{decision}");
            Ok(if decision.is_allowed() { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Commands::Version => {
            println!("warden {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_server(args: ServeArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;

    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.storage.backend = StorageBackendKind::Local;
        config.storage.data_dir = data_dir;
    }
    if let Some(rules) = args.rules {
        config.rules.file = Some(rules);
    }
    config.validate().context("Invalid configuration")?;

    init_logging(&config)?;

    if config.metrics.enabled {
        init_metrics();

        let metrics_addr: std::net::SocketAddr =
            format!("{}:{}", config.metrics.bind, config.metrics.port)
                .parse()
                .context("Invalid metrics bind address")?;

        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()
            .context("Failed to install Prometheus exporter")?;

        info!("Metrics endpoint listening on http://{}/metrics", metrics_addr);
    }

    let rules = config.load_rules().context("Failed to load access rules")?;
    info!(rules = rules.rules.len(), source = rules_source(&config), "Access rules loaded");

    let store: Arc<dyn ObjectStore> = match config.storage.backend {
        StorageBackendKind::Memory => Arc::new(MemoryStore::new()),
        StorageBackendKind::Local => Arc::new(
            LocalStore::open(config.storage.data_dir.clone())
                .await
                .context("Failed to open local store")?,
        ),
    };

    print_banner(&config);

    let state = AppState::new(store, Arc::new(rules), config.server.max_body_size);
    let app = create_router(state, config.logging.log_requests, &config.auth);

    let listener = TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(addr = %config.server.bind, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn run_check(args: &CheckArgs) -> Result<PolicyDecision> {
    let mut config = load_config(&args.config)?;
    if let Some(rules) = &args.rules {
        config.rules.file = Some(rules.clone());
    }
    let rules = config.load_rules().context("Failed to load access rules")?;

    let path = StoragePath::parse(&args.path).context("Invalid path")?;
    let actor = args.user.as_deref().map_or(Actor::Anonymous, Actor::user);

    let mut request = AccessRequest::new(actor, path, args.op);
    if args.size.is_some() || args.content_type.is_some() {
        request = request
            .with_payload(Payload::new(args.size.unwrap_or(0), args.content_type.as_deref()));
    }

    Ok(rules.evaluate(&request))
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    Config::load(path.as_deref()).context("Failed to load configuration")
}

fn rules_source(config: &Config) -> String {
    config
        .rules
        .file
        .as_ref()
        .map_or_else(|| "built-in".to_string(), |p| p.display().to_string())
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).try_init()?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}

fn print_banner(config: &Config) {
    let backend = match config.storage.backend {
        StorageBackendKind::Memory => "memory".to_string(),
        StorageBackendKind::Local => format!("local ({})", config.storage.data_dir.display()),
    };

    println!(
        r#"
  Warden  v{}

  Endpoint:    http://{}
  Storage:     {}
  Rules:       {}
  Upload max:  {} bytes ({})

  Try:
    curl -X PUT -H 'Authorization: Bearer alice' -H 'Content-Type: image/png' \
      --data-binary @icon.png http://{}/o/users/alice/icon.png
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.bind,
        backend,
        rules_source(config),
        config.rules.max_upload_bytes,
        config.rules.content_type,
        config.server.bind,
    );
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
