//! HTTP middleware configuration.

pub mod cors;

pub use cors::{CorsConfig, create_cors_layer};
