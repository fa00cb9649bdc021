use crate::config::AppConfig;
use crate::errors::ServiceError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{error, info};

/// Connection pool shared by every service.
pub type DbPool = DatabaseConnection;

/// Opens the pool described by the application config. Timeouts and pool
/// bounds all come from the config; SQLite URLs get the same treatment as
/// Postgres ones, which is what lets the test suites run on
/// `sqlite::memory:` with a single connection.
pub async fn connect(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let mut opts = ConnectOptions::new(cfg.database_url.clone());
    opts.max_connections(cfg.db_max_connections)
        .min_connections(cfg.db_min_connections)
        .connect_timeout(Duration::from_secs(cfg.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(cfg.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(cfg.db_idle_timeout_secs))
        .sqlx_logging(cfg.is_development());

    info!(
        max_connections = cfg.db_max_connections,
        "Connecting to database"
    );
    let pool = Database::connect(opts)
        .await
        .map_err(ServiceError::DatabaseError)?;
    info!("Database connection pool established");

    Ok(pool)
}

/// Applies every pending migration.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::DatabaseError);

    match &result {
        Ok(_) => info!(elapsed = ?start.elapsed(), "Database migrations completed"),
        Err(e) => error!(elapsed = ?start.elapsed(), error = %e, "Database migrations failed"),
    }

    result
}
