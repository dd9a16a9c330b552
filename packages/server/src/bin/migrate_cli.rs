//! CLI for running schema migrations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use server_core::config::Config;

#[derive(Parser)]
#[command(name = "migrate_cli")]
#[command(about = "Schema migration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all pending migrations
    Run,

    /// Show applied migrations
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let pool = get_pool().await?;

    match cli.command {
        Commands::Run => cmd_run(&pool).await,
        Commands::Status => cmd_status(&pool).await,
    }
}

async fn get_pool() -> Result<PgPool> {
    let config = Config::from_env()?;
    PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

async fn cmd_run(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations applied");
    Ok(())
}

async fn cmd_status(pool: &PgPool) -> Result<()> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT version, description FROM _sqlx_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await
    .context("Failed to read migration history")?;

    if rows.is_empty() {
        tracing::info!("No migrations applied");
    }
    for (version, description) in rows {
        tracing::info!(version, description = %description, "applied");
    }

    Ok(())
}
