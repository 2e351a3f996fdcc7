//! # Klasha
//!
//! Klasha checkout runs entirely in its inline widget, so initializing a
//! session makes no remote call: the session only records what the checkout
//! page needs and points the payer at a signed checkout URL. The session
//! reference doubles as the payment reference.

use crate::session_extra;
use async_trait::async_trait;
use chrono::Utc;
use gateway_core::record::{decimal_to_json, normalize_timestamp};
use gateway_core::{
    BoxedPaymentProvider, Channel, GatewayResult, HttpRequest, PaymentProvider, Phase,
    ProviderContext, SessionRecord, SessionRequest, TransactionRecord, TransactionStatus,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

pub const PROVIDER: &str = "klasha";
pub const REFERENCE_PREFIX: &str = "KSA_";
pub const DEFAULT_BASE_URL: &str = "https://gate.klasapps.com";
pub const DEFAULT_CHANNELS: &[Channel] = &[
    Channel::Card,
    Channel::BankTransfer,
    Channel::MobileMoney,
    Channel::Ussd,
];

/// Klasha adapter
pub struct KlashaProvider {
    ctx: ProviderContext,
}

impl KlashaProvider {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    /// Registry constructor
    pub fn boxed(ctx: ProviderContext) -> BoxedPaymentProvider {
        Arc::new(Self::new(ctx))
    }
}

#[async_trait]
impl PaymentProvider for KlashaProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn reference_prefix(&self) -> &'static str {
        REFERENCE_PREFIX
    }

    fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    #[instrument(skip(self, request), fields(provider = PROVIDER))]
    async fn open_session(
        &self,
        reference: &str,
        request: &SessionRequest,
    ) -> GatewayResult<SessionRecord> {
        let settings = self.ctx.settings.provider(PROVIDER)?;
        let ttl = self.ctx.settings.session_ttl();
        let callback_url = self.ctx.settings.callback_url(PROVIDER, reference);

        let mut extra = session_extra(
            request,
            decimal_to_json(request.amount),
            &self.channels(),
            &callback_url,
        );
        if let Some(public_key) = &settings.public_key {
            extra.insert("public_key".into(), json!(public_key));
        }

        debug!("Prepared Klasha inline checkout: reference={}", reference);

        Ok(SessionRecord {
            provider: PROVIDER.to_string(),
            session_reference: reference.to_string(),
            payment_reference: Some(reference.to_string()),
            checkout_secret: None,
            checkout_url: self.ctx.signer.sign(PROVIDER, reference, ttl),
            expires: ttl.as_secs(),
            extra,
            deferred_callback: request.callback.clone(),
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn fetch_transaction(&self, reference: &str) -> GatewayResult<TransactionRecord> {
        let settings = self.ctx.settings.provider(PROVIDER)?;

        let body = self
            .ctx
            .expect_success(
                PROVIDER,
                Phase::Verification,
                HttpRequest::post(
                    settings.endpoint("nucleus/tnx/merchant/status"),
                    json!({ "tnxRef": reference }),
                )
                .bearer(&settings.secret_key),
            )
            .await?;

        let status: StatusResponse = Phase::Verification.decode(PROVIDER, body)?;
        let email = Phase::Verification
            .require_str(PROVIDER, &status.customer, "/email")?
            .to_string();

        Ok(TransactionRecord {
            email,
            meta: status.customer,
            amount: status.source_amount,
            currency: status.source_currency,
            reference: reference.to_string(),
            provider: PROVIDER.to_string(),
            status: TransactionStatus::Reported(status.status),
            // The status endpoint carries no processing time
            date: normalize_timestamp(None),
        })
    }
}

// =============================================================================
// Klasha API Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: String,
    source_amount: Decimal,
    source_currency: String,
    /// Kept whole as the record's meta
    customer: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{
        GatewayError, GatewaySettings, HttpResponse, HttpTransport, InMemorySessionStore,
        ProviderSettings, TransportError,
    };
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct Replay {
        responses: Mutex<Vec<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for Replay {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    fn provider(responses: Vec<HttpResponse>) -> (KlashaProvider, Arc<Replay>) {
        let transport = Arc::new(Replay {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        });
        let ctx = ProviderContext::new(
            GatewaySettings::new("test-signing-key-0123", "https://pay.example.com").with_provider(
                PROVIDER,
                ProviderSettings::new(DEFAULT_BASE_URL, "klasha-secret")
                    .with_public_key("klasha-public")
                    .with_channels(DEFAULT_CHANNELS.iter().copied()),
            ),
            transport.clone(),
            Arc::new(InMemorySessionStore::new()),
        );
        (KlashaProvider::new(ctx), transport)
    }

    #[tokio::test]
    async fn test_initialize_makes_no_remote_call() {
        let (klasha, transport) = provider(vec![]);

        let session = klasha
            .initialize_session(SessionRequest::new("NGN", dec!(1500), "a@b.com"))
            .await
            .unwrap();

        assert!(transport.requests.lock().unwrap().is_empty());
        assert_eq!(
            session.payment_reference.as_deref(),
            Some(session.session_reference.as_str())
        );
        assert!(session.checkout_url.starts_with(&format!(
            "https://pay.example.com/checkout/klasha/{}?expires=",
            session.session_reference
        )));
        assert_eq!(session.extra["amount"], json!(1500));
        assert_eq!(session.extra["public_key"], json!("klasha-public"));
        assert_eq!(session.channels().len(), DEFAULT_CHANNELS.len());

        let checkout = klasha.context().signer.verify_url(&session.checkout_url).unwrap();
        assert_eq!(checkout.reference, session.session_reference);
    }

    #[tokio::test]
    async fn test_verify_maps_status() {
        let (klasha, transport) = provider(vec![HttpResponse {
            status: 200,
            body: json!({
                "status": "successful",
                "sourceAmount": 1500,
                "sourceCurrency": "NGN",
                "customer": {"email": "a@b.com", "firstName": "Ada"}
            }),
        }]);

        let record = klasha.fetch_transaction("KSA_abc").await.unwrap();

        assert_eq!(record.amount, dec!(1500));
        assert_eq!(record.currency, "NGN");
        assert_eq!(record.meta, json!({"email": "a@b.com", "firstName": "Ada"}));
        assert!(record.is_successful());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].body, Some(json!({"tnxRef": "KSA_abc"})));
        assert_eq!(requests[0].bearer.as_deref(), Some("klasha-secret"));
    }

    #[tokio::test]
    async fn test_verify_upstream_error() {
        let (klasha, _) = provider(vec![HttpResponse {
            status: 400,
            body: json!({"message": "Transaction not found"}),
        }]);

        let err = klasha.fetch_transaction("KSA_missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::Verification { status: Some(400), .. }));
    }
}
