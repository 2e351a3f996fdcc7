//! # Routes
//!
//! Axum router configuration for the payment API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - GET  /health - Health check
/// - GET  /api/v1/providers - Registered providers and channels
/// - POST /api/v1/{provider}/sessions - Initialize a checkout session
/// - GET  /checkout/{provider}/{reference} - Signed checkout link
/// - GET  /callback/{provider}/{reference} - Provider redirect after payment
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/providers", get(handlers::list_providers))
        .route("/{provider}/sessions", post(handlers::create_session));

    // Mounted where `RouteSettings` says the signer and adapters point payers
    let routes = &state.settings().routes;
    let checkout_path = format!("{}/{{provider}}/{{reference}}", routes.checkout_path);
    let callback_path = format!("{}/{{provider}}/{{reference}}", routes.callback_path);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .route(&checkout_path, get(handlers::checkout))
        .route(&callback_path, get(handlers::callback))
        .nest("/api/v1", api_routes)
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}
