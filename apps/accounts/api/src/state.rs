//! Shared application state.

use database::postgres::DatabaseConnection;
use domain_users::{PgUserRepository, UserService};

/// Cloned into each router; every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// PostgreSQL connection pool
    pub db: DatabaseConnection,
    pub users: UserService<PgUserRepository>,
}

impl AppState {
    /// Wires the users service to the pool with the configured cost and deadline.
    pub fn new(config: crate::config::Config, db: DatabaseConnection) -> eyre::Result<Self> {
        let mut users = UserService::new(PgUserRepository::new(db.clone()))
            .with_hasher(config.users.hasher()?);

        if let Some(deadline) = config.users.store_deadline {
            users = users.with_deadline(deadline);
        }

        Ok(Self { config, db, users })
    }
}
