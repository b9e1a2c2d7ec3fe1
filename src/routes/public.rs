use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages and actions reachable without a session. `/auth/login` and `/auth/register`
/// are still guarded: a signed-in visitor is sent to the dashboard instead.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::landing))
        .route("/privacy", get(handlers::privacy))
        .route("/terms", get(handlers::terms))
        // GET|POST /auth/login
        // Sign-in page / password sign-in. Success sets the session cookie.
        .route(
            "/auth/login",
            get(handlers::login_page).post(handlers::login),
        )
        // GET|POST /auth/register
        // Registration page / sign-up. Requires accepted terms.
        .route(
            "/auth/register",
            get(handlers::register_page).post(handlers::register),
        )
        .route("/auth/verify-email", get(handlers::verify_email_page))
        // POST /api/auth/logout
        // Outside the guard's matcher so a stale cookie can always be cleared.
        .route("/api/auth/logout", post(handlers::logout))
}
