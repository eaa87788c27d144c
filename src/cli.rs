use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use crate::app::{app, AppState};
use crate::auth::{AuthProvider, GoTrueClient};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgStore, TrackerStore};

#[derive(Parser)]
#[command(name = "ag-tracker")]
#[command(about = "Role-gated activity tracking dashboard API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on; overrides PORT")]
        port: Option<u16>,
    },

    #[command(about = "Check connectivity to the database and auth provider")]
    Check,
}

fn collaborators(config: &AppConfig) -> anyhow::Result<(Arc<dyn TrackerStore>, Arc<dyn AuthProvider>)> {
    let pool = DatabaseManager::connect_lazy(&config.database).context("database pool")?;
    let auth = GoTrueClient::from_config(&config.auth).context("auth provider client")?;
    Ok((Arc::new(PgStore::new(pool)), Arc::new(auth)))
}

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Check => check(config).await,
    }
}

async fn serve(config: AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.server.port);
    let (store, auth) = collaborators(&config)?;
    tracing::info!(environment = config.environment.as_str(), "Starting ag-tracker");

    let router = app(AppState::new(config, store, auth));

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("server error")
}

async fn check(config: AppConfig) -> anyhow::Result<()> {
    let (store, auth) = collaborators(&config)?;
    let (database, provider) = tokio::join!(store.ping(), auth.ping());

    let report = json!({
        "database": database.as_ref().map(|_| "ok".to_string()).unwrap_or_else(|e| e.to_string()),
        "auth": provider.as_ref().map(|_| "ok".to_string()).unwrap_or_else(|e| e.to_string()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if database.is_err() || provider.is_err() {
        anyhow::bail!("one or more collaborators are unreachable");
    }
    Ok(())
}
