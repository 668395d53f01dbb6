use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Before any fallible operation
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);
    info!(
        app = config.app.name,
        version = config.app.version,
        environment = ?config.environment,
        "Starting"
    );

    let db = database::postgres::connect_with_retry(&config.database, None)
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name).await?;

    let state = AppState::new(config, db)?;

    let router = create_router::<openapi::ApiDoc>(
        api::routes(&state),
        &state.config.cors,
        state.config.server.request_timeout,
    );

    // /health: liveness with name and version, /ready: database ping
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    let server_config = state.config.server.clone();
    let db = state.db.clone();

    create_production_app(app, &server_config, async move {
        info!("Shutting down: closing database connections");
        match db.close().await {
            Ok(()) => info!("PostgreSQL connection closed successfully"),
            Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Accounts API shutdown complete");
    Ok(())
}
