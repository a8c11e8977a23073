//! HTTP layer - JSON routes over the core operations
//!
//! Handlers stay thin: they extract the request, call into [`crate::core`] and
//! serialize the result. Errors become responses through the `IntoResponse`
//! impl in [`error`].

/// Bearer-token check for the trigger endpoints
pub mod auth;
/// Error to HTTP response mapping
pub mod error;
/// Route handlers grouped by area
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;

/// Shared state available to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Database connection for all database operations
    pub db: DatabaseConnection,
    /// Shared secret for the attendance trigger endpoints
    pub api_token: Option<String>,
}

impl AppState {
    /// Creates the state from a connection and the configured trigger token.
    #[must_use]
    pub const fn new(db: DatabaseConnection, api_token: Option<String>) -> Self {
        Self { db, api_token }
    }
}

/// Builds the full application router, everything mounted under `/api`.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/server-time", get(handlers::general::server_time))
        .route("/dashboard", get(handlers::general::dashboard))
        .route("/months", get(handlers::payments::list_months))
        .route(
            "/trigger-attendance-generation",
            post(handlers::attendance::trigger_generation),
        )
        .route(
            "/trigger-attendance-autosave",
            post(handlers::attendance::trigger_autosave),
        )
        .nest("/students", handlers::students::routes())
        .nest("/guardians", handlers::guardians::routes())
        .nest("/grades", handlers::grades::routes())
        .nest("/attendances", handlers::attendance::routes())
        .nest("/plans", handlers::payments::plan_routes())
        .nest("/payments", handlers::payments::payment_routes())
        .nest("/receipts", handlers::payments::receipt_routes());

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
