use axum::Router;

pub mod health;

/// API routes without the `/api` prefix; `create_router` adds it.
pub fn routes(state: &crate::state::AppState) -> Router {
    use domain_users::{auth_handlers, handlers};

    Router::new()
        .nest("/users", handlers::router(state.users.clone()))
        .nest("/auth", auth_handlers::auth_router(state.users.clone()))
}

/// `/ready`, probing the database. Merged next to the stateless app router.
pub fn ready_router(state: crate::state::AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
