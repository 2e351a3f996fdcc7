//! # Payment Provider Trait
//!
//! Every processor (Paystack, Seerbit, Klasha, ...) implements `PaymentProvider`.
//! Adapters supply the two provider-specific remote calls; the session and
//! notification lifecycle is shared through the provided methods.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentProvider (trait)                    │
//! │  ├── open_session()        provider-specific                │
//! │  ├── fetch_transaction()   provider-specific                │
//! │  ├── initialize_session()  store.get_or_create(open_session)│
//! │  └── confirm_transaction() fetch + deferred notification    │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!          ┌─────────────────┼─────────────────┐
//!  ┌───────┴───────┐ ┌───────┴───────┐ ┌───────┴───────┐
//!  │   Paystack    │ │    Seerbit    │ │    Klasha     │
//!  └───────────────┘ └───────────────┘ └───────────────┘
//! ```

use crate::config::GatewaySettings;
use crate::error::{GatewayError, GatewayResult};
use crate::notification::{CallbackHandle, NotificationRegistry};
use crate::record::{Channel, SessionRecord, SessionRequest, TransactionRecord};
use crate::reference::generate_reference;
use crate::signing::UrlSigner;
use crate::store::SharedSessionStore;
use crate::transport::{HttpRequest, HttpResponse, SharedTransport, TransportError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tracing target for raw provider traffic in debug mode
pub const DEBUG_TARGET: &str = "payment_gateways::debug";

/// Collaborators injected into every adapter
#[derive(Clone)]
pub struct ProviderContext {
    pub transport: SharedTransport,
    pub store: SharedSessionStore,
    pub notifications: NotificationRegistry,
    pub signer: UrlSigner,
    pub settings: Arc<GatewaySettings>,
}

impl ProviderContext {
    pub fn new(
        settings: GatewaySettings,
        transport: SharedTransport,
        store: SharedSessionStore,
    ) -> Self {
        let signer = UrlSigner::new(
            settings.signing_key.clone(),
            settings.routes.base_url.clone(),
            settings.routes.checkout_path.clone(),
        );
        Self {
            transport,
            store,
            notifications: NotificationRegistry::with_defaults(),
            signer,
            settings: Arc::new(settings),
        }
    }

    /// Builder: replace the notification registry
    pub fn with_notifications(mut self, notifications: NotificationRegistry) -> Self {
        self.notifications = notifications;
        self
    }

    /// Send a request, logging the raw exchange when debug mode is on
    pub async fn call(
        &self,
        provider: &str,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let debug_mode = self.settings.debug;
        if debug_mode {
            let null = Value::Null;
            let body = request.body.as_ref().unwrap_or(&null);
            info!(
                target: DEBUG_TARGET,
                provider,
                method = request.method.as_str(),
                url = %request.url,
                body = %body,
                "provider request"
            );
        }

        let url = request.url.clone();
        let result = self.transport.send(request).await;

        if debug_mode {
            match &result {
                Ok(response) => info!(
                    target: DEBUG_TARGET,
                    provider,
                    url = %url,
                    status = response.status,
                    body = %response.body,
                    "provider response"
                ),
                Err(err) => info!(
                    target: DEBUG_TARGET,
                    provider,
                    url = %url,
                    error = %err,
                    "provider request failed"
                ),
            }
        }

        result
    }

    /// Send a request and return the body of a 2xx response.
    ///
    /// Transport failures and non-2xx responses become `phase` errors.
    pub async fn expect_success(
        &self,
        provider: &str,
        phase: Phase,
        request: HttpRequest,
    ) -> GatewayResult<Value> {
        let response = self
            .call(provider, request)
            .await
            .map_err(|e| phase.error(provider, None, e.to_string()))?;

        if !response.is_success() {
            error!(
                "{} API error: status={}, body={}",
                provider, response.status, response.body
            );
            let message = response
                .message()
                .map(String::from)
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(phase.error(provider, Some(response.status), message));
        }

        Ok(response.body)
    }
}

/// Which remote call an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialization,
    Verification,
}

impl Phase {
    pub fn error(self, provider: &str, status: Option<u16>, message: impl Into<String>) -> GatewayError {
        let provider = provider.to_string();
        let message = message.into();
        match self {
            Phase::Initialization => GatewayError::Initialization {
                provider,
                status,
                message,
            },
            Phase::Verification => GatewayError::Verification {
                provider,
                status,
                message,
            },
        }
    }

    /// Field at JSON `pointer` (e.g. `/data/payments/redirectLink`)
    pub fn require<'a>(self, provider: &str, body: &'a Value, pointer: &str) -> GatewayResult<&'a Value> {
        body.pointer(pointer)
            .filter(|v| !v.is_null())
            .ok_or_else(|| self.error(provider, None, format!("response missing {}", pointer)))
    }

    /// String field at JSON `pointer`
    pub fn require_str<'a>(self, provider: &str, body: &'a Value, pointer: &str) -> GatewayResult<&'a str> {
        self.require(provider, body, pointer)?
            .as_str()
            .ok_or_else(|| self.error(provider, None, format!("{} is not a string", pointer)))
    }

    /// Deserialize a response body into the provider's wire type
    pub fn decode<T: DeserializeOwned>(self, provider: &str, body: Value) -> GatewayResult<T> {
        serde_json::from_value(body).map_err(|e| {
            self.error(
                provider,
                None,
                format!("Failed to parse {} response: {}", provider, e),
            )
        })
    }
}

/// Core trait for payment provider adapters.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider id, e.g. "paystack"
    fn provider_name(&self) -> &'static str;

    /// Literal reference prefix including the underscore, e.g. "PTK_"
    fn reference_prefix(&self) -> &'static str;

    /// Length of the random reference suffix
    fn reference_length(&self) -> usize {
        12
    }

    fn context(&self) -> &ProviderContext;

    /// Amount as stored in `SessionRecord::extra` (scaled for minor-unit providers)
    fn session_amount(&self, amount: Decimal) -> Decimal {
        amount
    }

    /// Create the remote session for `reference` and map it to a `SessionRecord`.
    ///
    /// Called at most once per live reference; use `initialize_session`.
    async fn open_session(
        &self,
        reference: &str,
        request: &SessionRequest,
    ) -> GatewayResult<SessionRecord>;

    /// Fetch and map the transaction for `reference`.
    async fn fetch_transaction(&self, reference: &str) -> GatewayResult<TransactionRecord>;

    /// Enabled payment channels (config-driven, no network call)
    fn channels(&self) -> BTreeSet<Channel> {
        self.context()
            .settings
            .providers
            .get(self.provider_name())
            .map(|p| p.channels.iter().copied().collect())
            .unwrap_or_default()
    }

    fn generate_reference(&self) -> String {
        generate_reference(self.reference_prefix(), self.reference_length())
    }

    /// Initialize a checkout session, cached under the session key for the TTL.
    ///
    /// A request carrying a reference that is still cached returns the cached
    /// session without another remote call.
    async fn initialize_session(&self, request: SessionRequest) -> GatewayResult<SessionRecord> {
        validate_request(self.provider_name(), self.reference_prefix(), &request)?;

        let ctx = self.context();
        ctx.notifications.ensure_known(request.callback.as_ref())?;

        let reference = request
            .reference
            .clone()
            .unwrap_or_else(|| self.generate_reference());
        let key = ctx.settings.session_key(&reference);

        debug!(
            "Initializing {} session: reference={}, amount={} {}",
            self.provider_name(),
            reference,
            request.amount,
            request.currency
        );

        let record = ctx
            .store
            .get_or_create(
                &key,
                ctx.settings.session_ttl(),
                self.open_session(&reference, &request),
            )
            .await?;

        let expected_amount = self.session_amount(request.amount);
        if record.email() != Some(request.email.as_str())
            || record.amount() != Some(expected_amount)
        {
            warn!(
                "Reference {} reused with different parameters; returning cached session",
                reference
            );
        }

        Ok(record)
    }

    /// Verify `reference` and run `callback` once with the result.
    ///
    /// The handle is consumed. It is not run when verification fails, and a
    /// failing handler fails this call.
    async fn confirm_transaction(
        &self,
        reference: &str,
        callback: Option<CallbackHandle>,
    ) -> GatewayResult<TransactionRecord> {
        let ctx = self.context();
        ctx.notifications.ensure_known(callback.as_ref())?;

        let record = self.fetch_transaction(reference).await?;

        info!(
            "Verified {} transaction: reference={}, successful={}",
            self.provider_name(),
            reference,
            record.is_successful()
        );

        ctx.notifications.dispatch(callback, &record).await?;
        Ok(record)
    }

    /// Live cached session for `reference`
    async fn initialized_session(&self, reference: &str) -> Option<SessionRecord> {
        let ctx = self.context();
        ctx.store
            .get(&ctx.settings.session_key(reference))
            .await
            .filter(|s| s.provider == self.provider_name())
    }

    /// Verify `reference` with the callback captured when its session was created.
    ///
    /// The stored callback is taken from the session before verifying, so only
    /// one confirmation ever runs it. A failed verification puts it back.
    async fn confirm_session(&self, reference: &str) -> GatewayResult<TransactionRecord> {
        let ctx = self.context();
        let key = ctx.settings.session_key(reference);

        let callback = match self.initialized_session(reference).await {
            Some(_) => ctx.store.take_callback(&key).await,
            None => None,
        };

        let record = match self.fetch_transaction(reference).await {
            Ok(record) => record,
            Err(err) => {
                if let Some(callback) = callback {
                    ctx.store.restore_callback(&key, callback).await;
                }
                return Err(err);
            }
        };

        info!(
            "Verified {} transaction: reference={}, successful={}",
            self.provider_name(),
            reference,
            record.is_successful()
        );

        ctx.notifications.dispatch(callback, &record).await?;
        Ok(record)
    }
}

/// Type alias for a boxed payment provider (dynamic dispatch)
pub type BoxedPaymentProvider = Arc<dyn PaymentProvider>;

fn validate_request(provider: &str, prefix: &str, request: &SessionRequest) -> GatewayResult<()> {
    if request.amount <= Decimal::ZERO {
        return Err(GatewayError::InvalidRequest(format!(
            "amount must be positive, got {}",
            request.amount
        )));
    }
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return Err(GatewayError::InvalidRequest(format!(
            "invalid email: {:?}",
            request.email
        )));
    }
    if request.currency.trim().len() != 3 {
        return Err(GatewayError::InvalidRequest(format!(
            "invalid currency: {:?}",
            request.currency
        )));
    }
    if let Some(reference) = &request.reference {
        if !reference.starts_with(prefix) || reference.len() <= prefix.len() {
            return Err(GatewayError::InvalidRequest(format!(
                "{} references must start with {}",
                provider, prefix
            )));
        }
    }
    Ok(())
}
