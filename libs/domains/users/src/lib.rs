//! Users Domain
//!
//! User lifecycle (create, update, soft delete, restore), credential checks
//! and role statistics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints (users + auth)
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, hashing, uniqueness, store deadline
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │ Repository  │  ← Trait + in-memory and PostgreSQL implementations
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs, roles
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_users::{InMemoryUserRepository, UserService, auth_handlers, handlers};
//!
//! let service = UserService::new(InMemoryUserRepository::new());
//!
//! let router = axum::Router::new()
//!     .nest("/users", handlers::router(service.clone()))
//!     .nest("/auth", auth_handlers::auth_router(service));
//! ```

pub mod auth_handlers;
pub mod entity;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod hasher;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use auth_handlers::AuthApiDoc;
pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use hasher::CredentialHasher;
pub use models::{
    CreateUser, LoginRequest, Role, UpdateUser, User, UserResponse, UserStats,
};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
