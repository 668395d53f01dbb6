//! # Axum Helpers
//!
//! Shared HTTP plumbing for the accounts service.
//!
//! - **[`errors`]**: `AppError` and the `{code, error, message, details}` envelope
//! - **[`extractors`]**: `ValidatedJson` and `UuidPath`
//! - **[`http`]**: CORS configuration
//! - **[`server`]**: router assembly, health/readiness, graceful shutdown
//!
//! ```ignore
//! use axum_helpers::{CorsConfig, create_production_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! let router = create_router::<ApiDoc>(api_routes, &CorsConfig::default(), config.request_timeout)
//!     .merge(health_router(app_info!()));
//! create_production_app(router, &config, async {}).await?;
//! ```

pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::{UuidPath, ValidatedJson};
pub use http::{CorsConfig, create_cors_layer};
pub use server::{
    HealthCheckFuture, HealthResponse, ReadyResponse, ShutdownCoordinator, create_production_app,
    create_router, health_router, run_health_checks, shutdown_signal,
};
