//! Scholaris bootstrap: applies migrations and seeds the system roles.

#![forbid(unsafe_code)]

mod bootstrap_config;

use std::str::FromStr;
use std::sync::Arc;

use scholaris_application::{RoleService, with_deadline};
use scholaris_core::{AppError, AppResult};
use scholaris_infrastructure::{PostgresPermissionRegistry, PostgresRoleRepository};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::bootstrap_config::BootstrapConfig;

#[tokio::main]
async fn main() -> AppResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = BootstrapConfig::load()?;
    let pool = connect(&config).await?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let role_service = RoleService::new(
        Arc::new(PostgresPermissionRegistry::new(pool.clone())),
        Arc::new(PostgresRoleRepository::new(pool)),
    );
    let report = with_deadline(config.seed_timeout, role_service.seed_system_roles()).await?;

    info!(
        version = report.version,
        created = ?report.created,
        existing = ?report.existing,
        conflicts = ?report.conflicts,
        "system roles seeded"
    );

    Ok(())
}

async fn connect(config: &BootstrapConfig) -> AppResult<PgPool> {
    let statement_timeout = config.statement_timeout_ms.to_string();
    let options = PgConnectOptions::from_str(config.database_url.as_str())
        .map_err(|error| AppError::Validation(format!("invalid DATABASE_URL: {error}")))?
        .options([("statement_timeout", statement_timeout.as_str())]);

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
