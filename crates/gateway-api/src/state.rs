//! # Application State
//!
//! Shared state for the Axum application: the provider registry (which owns
//! the session store, transport and signer) plus server configuration.

use anyhow::Context;
use gateway_core::{GatewaySettings, InMemorySessionStore, ProviderContext, ProviderRegistry};
use gateway_providers::{
    apply_default_channels, default_registry, settings_from_env, ReqwestTransport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Gateway settings files, first match wins
const SETTINGS_PATHS: &[&str] = &[
    "config/payment-gateways.toml",
    "../config/payment-gateways.toml",
    "../../config/payment-gateways.toml",
];

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Provider adapters and their shared collaborators
    pub registry: ProviderRegistry,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Build state from the settings file or the environment
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let settings = load_settings()?;

        let transport = ReqwestTransport::new(settings.request_timeout())
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP transport: {}", e))?;

        let ctx = ProviderContext::new(
            settings,
            Arc::new(transport),
            Arc::new(InMemorySessionStore::new()),
        );

        Ok(Self::with_registry(config, default_registry(ctx)))
    }

    /// Build state around an existing registry
    pub fn with_registry(config: AppConfig, registry: ProviderRegistry) -> Self {
        Self { registry, config }
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.registry.context().settings
    }

    /// Periodically evict expired sessions from the store
    pub fn spawn_session_sweeper(&self) -> JoinHandle<()> {
        let store = self.registry.context().store.clone();
        let period = self.settings().session_ttl().max(Duration::from_secs(60));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let purged = store.purge_expired().await;
                if purged > 0 {
                    debug!("Purged {} expired sessions", purged);
                }
            }
        })
    }
}

/// Load gateway settings from the first settings file found, else from the environment
fn load_settings() -> anyhow::Result<GatewaySettings> {
    for path in SETTINGS_PATHS {
        if let Ok(content) = std::fs::read_to_string(path) {
            let mut settings = GatewaySettings::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            apply_default_channels(&mut settings);
            info!(
                "Loaded {} providers from {}",
                settings.providers.len(),
                path
            );
            return Ok(settings);
        }
    }

    warn!("No settings file found, reading configuration from the environment");
    settings_from_env().map_err(|e| anyhow::anyhow!("Failed to load gateway settings: {}", e))
}
