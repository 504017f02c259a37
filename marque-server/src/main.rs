//! marque-server - MarquePage reading tracker
//!
//! `serve` (the default) runs the HTTP API; `add-user` and `rotate-token`
//! manage accounts and print a fresh bearer token.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marque_common::auth::{generate_token, hash_token};
use marque_common::config::{AppConfig, CliOverrides};
use marque_common::db::{init_database, users};
use marque_server::covers::FsCoverStore;
use marque_server::{build_router, AppState};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for marque-server
#[derive(Parser, Debug)]
#[command(name = "marque-server")]
#[command(about = "MarquePage reading tracker service")]
#[command(version)]
struct Args {
    /// Root folder holding the database and cover images
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "MARQUE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, global = true)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,

    /// Create a user and print their API token
    AddUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },

    /// Issue a new API token for an existing user
    RotateToken {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let cli = CliOverrides {
        root_folder: args.root_folder.clone(),
        bind_address: args.bind.clone(),
        port: args.port,
        log_level: args.log_level.clone(),
        config_file: args.config.clone(),
    };

    // Log level from the CLI/defaults until the config file is read;
    // RUST_LOG always wins
    let initial_level = cli.log_level.clone().unwrap_or_else(|| "info".to_string());
    let (filter, reload_handle) = tracing_subscriber::reload::Layer::new(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&initial_level)),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting MarquePage (marque-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = AppConfig::resolve(&cli);
    if std::env::var("RUST_LOG").is_err() && config.log_level != initial_level {
        reload_handle
            .reload(tracing_subscriber::EnvFilter::new(&config.log_level))
            .context("Failed to apply configured log level")?;
    }

    config
        .ensure_directories()
        .context("Failed to create root folder")?;
    info!("Root folder: {}", config.root_folder.display());

    let pool = init_database(&config.database_path())
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::AddUser { name, email } => {
            let token = generate_token();
            let user = users::insert_user(&pool, &name, &email, &hash_token(&token))
                .await
                .context("Failed to create user")?;
            info!("Created user {} <{}>", user.id, user.email);
            println!("{}", token);
            Ok(())
        }
        Command::RotateToken { email } => {
            let token = generate_token();
            if !users::rotate_token(&pool, &email, &hash_token(&token))
                .await
                .context("Failed to rotate token")?
            {
                anyhow::bail!("No user with email {}", email);
            }
            info!("Issued new token for {}", email);
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig, pool: sqlx::SqlitePool) -> Result<()> {
    let covers = Arc::new(FsCoverStore::new(config.covers_path()));
    let state = AppState::new(pool, covers, config.max_cover_upload_kb);
    let app = build_router(state);

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;

    info!("marque-server listening on http://{}", address);
    info!("Health check: http://{}/health", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
