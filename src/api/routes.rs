//! REST API routes configuration

use crate::api::handlers::{self, ApiState};
use crate::api::websocket::ws_handler;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

/// Fallback handler returning a JSON 404
async fn fallback_handler(uri: axum::http::Uri) -> impl IntoResponse {
    log::debug!("No route for {}", uri.path());

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"error":"Not Found"}"#))
        .unwrap_or_else(|_| StatusCode::NOT_FOUND.into_response())
}

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    // Configure CORS for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // WebSocket for real-time updates
        .route("/ws", get(ws_handler))
        // Vault
        .route("/api/vault", get(handlers::get_vault_info))
        .route("/api/balance", get(handlers::get_balance))
        .route("/api/deposit", post(handlers::deposit))
        .route("/api/events", get(handlers::get_events))
        // Transactions
        .route(
            "/api/transactions",
            get(handlers::list_transactions).post(handlers::propose_transaction),
        )
        .route("/api/transactions/{index}", get(handlers::get_transaction))
        .route(
            "/api/transactions/{index}/confirm",
            post(handlers::confirm_transaction),
        )
        .route(
            "/api/transactions/{index}/revoke",
            post(handlers::revoke_confirmation),
        )
        .route(
            "/api/transactions/{index}/execute",
            post(handlers::execute_transaction),
        )
        .fallback(fallback_handler)
        // Add state and middleware
        .with_state(state)
        .layer(cors)
}
