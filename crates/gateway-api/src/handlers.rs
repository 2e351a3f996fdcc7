//! # Request Handlers
//!
//! Axum request handlers for the payment API.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use gateway_core::{GatewayError, SessionRecord, SessionRequest, TransactionRecord};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Query string of a signed checkout URL
#[derive(Debug, Deserialize)]
pub struct CheckoutQuery {
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default)]
    pub signature: Option<String>,
}

/// Entry in the provider listing
#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub configured: bool,
    pub channels: Vec<&'static str>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn gateway_error_to_response(err: GatewayError) -> ApiError {
    let code = err.status_code();
    let response = match &err {
        GatewayError::SessionNotFound { .. } => {
            ErrorResponse::new("Payment session has expired", code).with_details(err.to_string())
        }
        _ => ErrorResponse::new(err.to_string(), code),
    };
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "payment-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List registered providers and their enabled channels
pub async fn list_providers(State(state): State<AppState>) -> impl IntoResponse {
    let providers: Vec<ProviderInfo> = state
        .registry
        .providers()
        .into_iter()
        .filter_map(|name| state.registry.resolve(name).ok())
        .map(|provider| ProviderInfo {
            name: provider.provider_name(),
            configured: state.settings().providers.contains_key(provider.provider_name()),
            channels: provider.channels().iter().map(|c| c.as_str()).collect(),
        })
        .collect();
    let count = providers.len();

    Json(serde_json::json!({
        "providers": providers,
        "count": count
    }))
}

/// Initialize a checkout session
#[instrument(skip(state, request), fields(provider = %provider, currency = %request.currency))]
pub async fn create_session(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Json(request): Json<SessionRequest>,
) -> Result<Json<SessionRecord>, ApiError> {
    let adapter = state.registry.resolve(&provider).map_err(gateway_error_to_response)?;

    let session = adapter.initialize_session(request).await.map_err(|e| {
        error!("Failed to initialize session: {}", e);
        gateway_error_to_response(e)
    })?;

    info!(
        "Initialized session: provider={}, reference={}",
        session.provider, session.session_reference
    );

    Ok(Json(session))
}

/// Resolve a signed checkout URL to its live session
#[instrument(skip(state, query))]
pub async fn checkout(
    State(state): State<AppState>,
    Path((provider, reference)): Path<(String, String)>,
    Query(query): Query<CheckoutQuery>,
) -> Result<Json<SessionRecord>, ApiError> {
    let (Some(expires), Some(signature)) = (query.expires, query.signature.as_deref()) else {
        return Err(gateway_error_to_response(GatewayError::InvalidSignature(
            "Missing expires or signature parameter".to_string(),
        )));
    };

    let adapter = state.registry.resolve(&provider).map_err(gateway_error_to_response)?;

    state
        .registry
        .context()
        .signer
        .verify(adapter.provider_name(), &reference, expires, signature)
        .map_err(gateway_error_to_response)?;

    let session = adapter
        .initialized_session(&reference)
        .await
        .ok_or_else(|| gateway_error_to_response(GatewayError::SessionNotFound { reference }))?;

    Ok(Json(session))
}

/// Provider redirect target: verify the payment and run the deferred notification
#[instrument(skip(state))]
pub async fn callback(
    State(state): State<AppState>,
    Path((provider, reference)): Path<(String, String)>,
) -> Result<Json<TransactionRecord>, ApiError> {
    let adapter = state.registry.resolve(&provider).map_err(gateway_error_to_response)?;

    let transaction = adapter.confirm_session(&reference).await.map_err(|e| {
        error!("Failed to confirm transaction {}: {}", reference, e);
        gateway_error_to_response(e)
    })?;

    Ok(Json(transaction))
}
