//! PostgreSQL plumbing shared by the service binaries.
//!
//! - [`postgres`]: pool configuration, connect-with-retry, migrations, health check
//! - [`common`]: error type and retry/backoff policy
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::postgres::{self, PostgresConfig};
//!
//! let config = PostgresConfig::from_env()?;
//! let db = postgres::connect_with_retry(&config, None).await?;
//! postgres::run_migrations::<migration::Migrator>(&db, "accounts_api").await?;
//! ```

pub mod common;
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult, RetryPolicy};
