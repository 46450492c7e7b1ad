use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Defines endpoints that are **unauthenticated** and accessible to any
/// client: the liveness probe and the identity gateway (registration and
/// login). Everything else in the API sits behind a role gate.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // A simple, unauthenticated endpoint used for monitoring and load
        // balancer checks. Returns "ok" immediately.
        .route("/health", get(|| async { "ok" }))
        // POST /api/auth/register
        // Creates a new identity with a hashed password and the requested
        // roles, atomically. Failures are reported generically.
        .route("/api/auth/register", post(handlers::register))
        // POST /api/auth/login
        // Verifies credentials and issues the signed 15-minute bearer token.
        .route("/api/auth/login", post(handlers::login))
}
