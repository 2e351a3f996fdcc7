//! # HTTP Transport
//!
//! Outbound HTTP is injected into adapters through `HttpTransport`, so tests
//! can substitute a stub upstream. Implementations return the status and the
//! JSON body for every response, successful or not; only failures to get a
//! response at all are `TransportError`s.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A JSON request to a provider API
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Sent as `Authorization: Bearer {token}`
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            bearer: None,
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            bearer: None,
            body: Some(body),
        }
    }

    /// Builder: attach a bearer token
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// A provider API response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed JSON body, `Value::Null` when empty or not JSON
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The provider's own error message, if the body carries one
    pub fn message(&self) -> Option<&str> {
        self.body
            .get("message")
            .or_else(|| self.body.get("error").and_then(|e| e.get("message")))
            .or_else(|| self.body.get("error"))
            .and_then(Value::as_str)
    }
}

/// Failure to obtain any response
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("invalid response body: {0}")]
    Body(String),
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Type alias for a shared transport (dynamic dispatch)
pub type SharedTransport = Arc<dyn HttpTransport>;
