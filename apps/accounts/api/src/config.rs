use core_config::{AppInfo, ConfigError, FromEnv, app_info, env_parse_optional, server::ServerConfig};
use std::time::Duration;

use axum_helpers::CorsConfig;
use database::postgres::PostgresConfig;
use domain_users::{CredentialHasher, UserResult};

pub use core_config::Environment;

/// Settings for the users domain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UsersConfig {
    /// Upper bound on each store call; unset means no bound
    pub store_deadline: Option<Duration>,
    pub hash_memory_kib: Option<u32>,
    pub hash_iterations: Option<u32>,
    pub hash_parallelism: Option<u32>,
}

impl UsersConfig {
    /// Argon2id with the configured cost, filling unset parameters with the
    /// library defaults.
    pub fn hasher(&self) -> UserResult<CredentialHasher> {
        if self.hash_memory_kib.is_none()
            && self.hash_iterations.is_none()
            && self.hash_parallelism.is_none()
        {
            return Ok(CredentialHasher::new());
        }

        CredentialHasher::with_params(
            self.hash_memory_kib.unwrap_or(CredentialHasher::DEFAULT_MEMORY_KIB),
            self.hash_iterations.unwrap_or(CredentialHasher::DEFAULT_ITERATIONS),
            self.hash_parallelism.unwrap_or(CredentialHasher::DEFAULT_PARALLELISM),
        )
    }
}

/// - STORE_DEADLINE_MS: optional, milliseconds
/// - HASH_MEMORY_KIB, HASH_ITERATIONS, HASH_PARALLELISM: optional Argon2 cost
impl FromEnv for UsersConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store_deadline: env_parse_optional::<u64>("STORE_DEADLINE_MS")?
                .map(Duration::from_millis),
            hash_memory_kib: env_parse_optional("HASH_MEMORY_KIB")?,
            hash_iterations: env_parse_optional("HASH_ITERATIONS")?,
            hash_parallelism: env_parse_optional("HASH_PARALLELISM")?,
        })
    }
}

/// Application configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub database: PostgresConfig,
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub users: UsersConfig,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?; // DATABASE_URL is required
        let server = ServerConfig::from_env()?;
        let cors = CorsConfig::from_env()?;
        let users = UsersConfig::from_env()?;

        Ok(Self {
            app: app_info!(),
            database,
            server,
            cors,
            users,
            environment,
        })
    }
}
