use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use super::PostgresConfig;
use crate::common::{DatabaseError, RetryPolicy, retry_with_backoff};

/// Open a connection pool using the given settings
pub async fn connect(config: &PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.clone().into_connect_options()).await?;
    info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(db)
}

/// Connect with exponential backoff, for startup while the database may
/// still be coming up. `None` uses [`RetryPolicy::default`].
pub async fn connect_with_retry(
    config: &PostgresConfig,
    policy: Option<RetryPolicy>,
) -> Result<DatabaseConnection, DatabaseError> {
    let policy = policy.unwrap_or_default();

    retry_with_backoff(&policy, || connect(config))
        .await
        .map_err(|(e, attempts)| DatabaseError::ConnectionFailed {
            attempts,
            reason: e.to_string(),
        })
}

/// Apply all pending migrations of `M`
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> Result<(), DatabaseError> {
    info!(app = app_name, "Running database migrations");
    M::up(db, None)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!(app = app_name, "Database migrations complete");
    Ok(())
}
