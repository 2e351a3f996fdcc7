//! # Gateway Configuration
//!
//! Gateway-wide and per-provider settings. Loaded from environment variables
//! (with `.env` support) or from a TOML file such as `config/payment-gateways.toml`:
//!
//! ```toml
//! signing_key = "change-me"
//! debug = false
//! request_timeout_secs = 30
//!
//! [session]
//! key_prefix = "payment_gateway_session_"
//! ttl_secs = 3600
//!
//! [routes]
//! base_url = "https://pay.example.com"
//!
//! [providers.paystack]
//! base_url = "https://api.paystack.co"
//! secret_key = "sk_test_..."
//! channels = ["card", "bank", "ussd"]
//! ```

use crate::error::{GatewayError, GatewayResult};
use crate::record::Channel;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

pub const DEFAULT_SESSION_PREFIX: &str = "payment_gateway_session_";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Session cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Prepended to every session reference to build the store key
    #[serde(default = "default_prefix")]
    pub key_prefix: String,

    /// Session lifetime; also the `expires` of every `SessionRecord`
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

fn default_prefix() -> String {
    DEFAULT_SESSION_PREFIX.to_string()
}

fn default_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            key_prefix: default_prefix(),
            ttl_secs: default_ttl(),
        }
    }
}

/// Where checkout and callback routes are mounted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSettings {
    pub base_url: String,
    #[serde(default = "default_checkout_path")]
    pub checkout_path: String,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
}

fn default_checkout_path() -> String {
    "/checkout".to_string()
}

fn default_callback_path() -> String {
    "/callback".to_string()
}

impl RouteSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            checkout_path: default_checkout_path(),
            callback_path: default_callback_path(),
        }
    }
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

/// Credentials and options for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub base_url: String,
    pub secret_key: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl ProviderSettings {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            public_key: None,
            channels: Vec::new(),
        }
    }

    /// Builder: set the public key
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    /// Builder: set enabled channels
    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Channel>) -> Self {
        self.channels = channels.into_iter().collect();
        self
    }

    /// `base_url` joined with `path`, with exactly one slash between them
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Load `{ID}_SECRET_KEY`, `{ID}_PUBLIC_KEY`, `{ID}_BASE_URL` and `{ID}_CHANNELS`.
    ///
    /// Returns `Ok(None)` when the provider has no secret key configured.
    pub fn from_env(
        provider: &str,
        default_base_url: &str,
        default_channels: &[Channel],
    ) -> GatewayResult<Option<Self>> {
        let var = |suffix: &str| env::var(format!("{}_{}", provider.to_uppercase(), suffix)).ok();

        let Some(secret_key) = var("SECRET_KEY") else {
            return Ok(None);
        };

        let channels = match var("CHANNELS") {
            Some(list) => parse_channels(&list)?,
            None => default_channels.to_vec(),
        };

        Ok(Some(Self {
            base_url: var("BASE_URL").unwrap_or_else(|| default_base_url.to_string()),
            secret_key,
            public_key: var("PUBLIC_KEY"),
            channels,
        }))
    }
}

/// Parse a comma-separated channel list such as `card,bank,ussd`
pub fn parse_channels(list: &str) -> GatewayResult<Vec<Channel>> {
    list.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| c.parse::<Channel>().map_err(GatewayError::Configuration))
        .collect()
}

/// Settings shared by every adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Key for checkout URL signatures
    pub signing_key: String,

    /// Log raw provider requests and responses
    #[serde(default)]
    pub debug: bool,

    /// Deadline for each provider HTTP call; unset means no client-side timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub routes: RouteSettings,

    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
}

impl GatewaySettings {
    /// Create settings with explicit values (for testing)
    pub fn new(signing_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            signing_key: signing_key.into(),
            debug: false,
            request_timeout_secs: None,
            session: SessionSettings::default(),
            routes: RouteSettings::new(base_url),
            providers: HashMap::new(),
        }
    }

    /// Load gateway-wide settings from environment variables.
    ///
    /// Required: `PAYMENT_GATEWAY_SIGNING_KEY`.
    /// Optional: `BASE_URL`, `PAYMENT_GATEWAY_SESSION_PREFIX`,
    /// `PAYMENT_GATEWAY_SESSION_TTL`, `PAYMENT_GATEWAY_DEBUG`,
    /// `PAYMENT_GATEWAY_REQUEST_TIMEOUT`.
    /// Providers are added by the caller with `with_provider`.
    pub fn from_env() -> GatewayResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let signing_key = env::var("PAYMENT_GATEWAY_SIGNING_KEY").map_err(|_| {
            GatewayError::Configuration("PAYMENT_GATEWAY_SIGNING_KEY not set".to_string())
        })?;

        if signing_key.len() < 16 {
            return Err(GatewayError::Configuration(
                "PAYMENT_GATEWAY_SIGNING_KEY must be at least 16 characters".to_string(),
            ));
        }

        let ttl_secs = match env::var("PAYMENT_GATEWAY_SESSION_TTL") {
            Ok(raw) => raw.parse().map_err(|_| {
                GatewayError::Configuration(format!(
                    "PAYMENT_GATEWAY_SESSION_TTL must be a number of seconds, got {}",
                    raw
                ))
            })?,
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        let request_timeout_secs = match env::var("PAYMENT_GATEWAY_REQUEST_TIMEOUT") {
            Ok(raw) => Some(raw.parse().map_err(|_| {
                GatewayError::Configuration(format!(
                    "PAYMENT_GATEWAY_REQUEST_TIMEOUT must be a number of seconds, got {}",
                    raw
                ))
            })?),
            Err(_) => None,
        };

        let debug = env::var("PAYMENT_GATEWAY_DEBUG")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Ok(Self {
            signing_key,
            debug,
            request_timeout_secs,
            session: SessionSettings {
                key_prefix: env::var("PAYMENT_GATEWAY_SESSION_PREFIX")
                    .unwrap_or_else(|_| default_prefix()),
                ttl_secs,
            },
            routes: RouteSettings::new(
                env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            ),
            providers: HashMap::new(),
        })
    }

    /// Parse settings from TOML
    pub fn from_toml_str(raw: &str) -> GatewayResult<Self> {
        toml::from_str(raw).map_err(|e| GatewayError::Configuration(e.to_string()))
    }

    /// Builder: add a provider
    pub fn with_provider(mut self, name: impl Into<String>, settings: ProviderSettings) -> Self {
        self.providers.insert(name.into(), settings);
        self
    }

    /// Builder: set the session TTL
    pub fn with_session_ttl(mut self, ttl_secs: u64) -> Self {
        self.session.ttl_secs = ttl_secs;
        self
    }

    /// Builder: toggle raw request/response logging
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Settings for `provider`, or a configuration error
    pub fn provider(&self, provider: &str) -> GatewayResult<&ProviderSettings> {
        self.providers.get(provider).ok_or_else(|| {
            GatewayError::Configuration(format!("provider '{}' is not configured", provider))
        })
    }

    /// Builder: set the per-request deadline for provider calls
    pub fn with_request_timeout(mut self, timeout_secs: u64) -> Self {
        self.request_timeout_secs = Some(timeout_secs);
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session.ttl_secs)
    }

    /// Store key for a session reference
    pub fn session_key(&self, reference: &str) -> String {
        format!("{}{}", self.session.key_prefix, reference)
    }

    /// Where the provider sends the payer after payment
    pub fn callback_url(&self, provider: &str, reference: &str) -> String {
        format!(
            "{}{}/{}/{}",
            self.routes.base_url, self.routes.callback_path, provider, reference
        )
    }
}
