//! # Seerbit
//!
//! Every call first mints an encrypted key from `"{secret}.{public}"`, then
//! authenticates with it as bearer token. Seerbit hosts its own checkout page,
//! so the session carries the returned redirect link. Amounts are unscaled.

use crate::session_extra;
use async_trait::async_trait;
use chrono::Utc;
use gateway_core::record::{decimal_to_json, normalize_timestamp};
use gateway_core::{
    BoxedPaymentProvider, Channel, GatewayError, GatewayResult, HttpRequest, PaymentProvider,
    Phase, ProviderContext, ProviderSettings, SessionRecord, SessionRequest, TransactionRecord,
    TransactionStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const PROVIDER: &str = "seerbit";
pub const REFERENCE_PREFIX: &str = "SEBT_";
pub const DEFAULT_BASE_URL: &str = "https://seerbitapi.com";
pub const DEFAULT_CHANNELS: &[Channel] = &[
    Channel::Card,
    Channel::Bank,
    Channel::BankTransfer,
    Channel::Ussd,
];

/// Country sent when the request meta carries no `country_code`
const DEFAULT_COUNTRY: &str = "NG";

/// Seerbit adapter
pub struct SeerbitProvider {
    ctx: ProviderContext,
}

impl SeerbitProvider {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    /// Registry constructor
    pub fn boxed(ctx: ProviderContext) -> BoxedPaymentProvider {
        Arc::new(Self::new(ctx))
    }

    /// Exchange the key pair for a short-lived bearer token
    async fn encrypted_key(&self, settings: &ProviderSettings, phase: Phase) -> GatewayResult<String> {
        let public_key = public_key(settings)?;

        let body = self
            .ctx
            .expect_success(
                PROVIDER,
                phase,
                HttpRequest::post(
                    settings.endpoint("api/v2/encrypt/keys"),
                    json!({ "key": format!("{}.{}", settings.secret_key, public_key) }),
                ),
            )
            .await?;

        let response: EncryptKeyResponse = phase.decode(PROVIDER, body)?;
        debug!("Minted Seerbit encrypted key");
        Ok(response.data.encrypted_sec_key.encrypted_key)
    }
}

fn public_key(settings: &ProviderSettings) -> GatewayResult<&str> {
    settings.public_key.as_deref().ok_or_else(|| {
        GatewayError::Configuration("SEERBIT_PUBLIC_KEY is required".to_string())
    })
}

#[async_trait]
impl PaymentProvider for SeerbitProvider {
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
        let token = self.encrypted_key(settings, Phase::Initialization).await?;

        let callback_url = request
            .meta
            .get("callback_url")
            .and_then(Value::as_str)
            .map(String::from)
            .unwrap_or_else(|| self.ctx.settings.callback_url(PROVIDER, reference));
        let country = request
            .meta
            .get("country_code")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_COUNTRY);

        let payload = PaymentRequest {
            public_key: public_key(settings)?,
            email: &request.email,
            amount: request.amount.normalize().to_string(),
            currency: &request.currency,
            country,
            payment_reference: reference,
            callback_url: &callback_url,
        };

        let body = self
            .ctx
            .expect_success(
                PROVIDER,
                Phase::Initialization,
                HttpRequest::post(settings.endpoint("api/v2/payments"), serde_json::to_value(&payload)?)
                    .bearer(token),
            )
            .await?;

        let response: PaymentResponse = Phase::Initialization.decode(PROVIDER, body)?;
        let redirect_link = response.data.payments.redirect_link;

        info!(
            "Created Seerbit payment: reference={}, redirect={}",
            reference, redirect_link
        );

        let mut extra = session_extra(
            request,
            decimal_to_json(request.amount),
            &self.channels(),
            &callback_url,
        );
        extra.insert("country".into(), json!(country));

        Ok(SessionRecord {
            provider: PROVIDER.to_string(),
            session_reference: reference.to_string(),
            payment_reference: None,
            checkout_secret: None,
            checkout_url: redirect_link,
            expires: self.ctx.settings.session.ttl_secs,
            extra,
            deferred_callback: request.callback.clone(),
            created_at: Utc::now(),
        })
    }

    #[instrument(skip(self), fields(provider = PROVIDER))]
    async fn fetch_transaction(&self, reference: &str) -> GatewayResult<TransactionRecord> {
        let settings = self.ctx.settings.provider(PROVIDER)?;
        let token = self.encrypted_key(settings, Phase::Verification).await?;

        let body = self
            .ctx
            .expect_success(
                PROVIDER,
                Phase::Verification,
                HttpRequest::get(settings.endpoint(&format!("api/v2/payments/query/{}", reference)))
                    .bearer(token),
            )
            .await?;

        let response: QueryResponse = Phase::Verification.decode(PROVIDER, body)?;
        let QueryData { payments, customers } = response.data;

        Ok(TransactionRecord {
            email: customers.customer_email,
            meta: json!({
                "sourceIP": payments.source_ip,
                "deviceType": payments.device_type,
            }),
            amount: payments.amount,
            currency: payments.currency,
            reference: reference.to_string(),
            provider: PROVIDER.to_string(),
            status: TransactionStatus::Reported(payments.gateway_message),
            date: normalize_timestamp(payments.transaction_processed_time.as_deref()),
        })
    }
}

// =============================================================================
// Seerbit API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct EncryptKeyResponse {
    data: EncryptKeyData,
}

#[derive(Debug, Deserialize)]
struct EncryptKeyData {
    #[serde(rename = "EncryptedSecKey")]
    encrypted_sec_key: EncryptedSecKey,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncryptedSecKey {
    encrypted_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequest<'a> {
    public_key: &'a str,
    email: &'a str,
    amount: String,
    currency: &'a str,
    country: &'a str,
    payment_reference: &'a str,
    callback_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    data: PaymentData,
}

#[derive(Debug, Deserialize)]
struct PaymentData {
    payments: PaymentLink,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentLink {
    redirect_link: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: QueryData,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    payments: QueryPayment,
    customers: QueryCustomer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPayment {
    amount: Decimal,
    currency: String,
    gateway_message: String,
    #[serde(default)]
    transaction_processed_time: Option<String>,
    #[serde(default, rename = "sourceIP")]
    source_ip: Option<String>,
    #[serde(default)]
    device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryCustomer {
    customer_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{GatewaySettings, HttpResponse, HttpTransport, InMemorySessionStore, TransportError};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct Replay {
        responses: Mutex<Vec<Value>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl HttpTransport for Replay {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request);
            let body = self.responses.lock().unwrap().remove(0);
            Ok(HttpResponse { status: 200, body })
        }
    }

    fn provider(settings: ProviderSettings, responses: Vec<Value>) -> (SeerbitProvider, Arc<Replay>) {
        let transport = Arc::new(Replay {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        });
        let ctx = ProviderContext::new(
            GatewaySettings::new("test-signing-key-0123", "https://pay.example.com")
                .with_provider(PROVIDER, settings),
            transport.clone(),
            Arc::new(InMemorySessionStore::new()),
        );
        (SeerbitProvider::new(ctx), transport)
    }

    fn key_response() -> Value {
        json!({"status": "SUCCESS", "data": {"code": "00", "EncryptedSecKey": {"encryptedKey": "enc-token"}}})
    }

    #[tokio::test]
    async fn test_initialize_uses_encrypted_key() {
        let (seerbit, transport) = provider(
            ProviderSettings::new(DEFAULT_BASE_URL, "sk").with_public_key("pk"),
            vec![
                key_response(),
                json!({"status": "SUCCESS", "data": {"payments": {"redirectLink": "https://checkout.seerbitapi.com/x"}}}),
            ],
        );

        let session = seerbit
            .initialize_session(
                SessionRequest::new("GHS", dec!(250.50), "a@b.com").with_meta("country_code", "GH"),
            )
            .await
            .unwrap();

        assert_eq!(session.checkout_url, "https://checkout.seerbitapi.com/x");
        assert_eq!(session.payment_reference, None);
        assert_eq!(session.extra["country"], json!("GH"));
        assert_eq!(session.amount(), Some(dec!(250.5)));

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].url, "https://seerbitapi.com/api/v2/encrypt/keys");
        assert_eq!(requests[0].body, Some(json!({"key": "sk.pk"})));
        assert_eq!(requests[1].bearer.as_deref(), Some("enc-token"));

        let sent = requests[1].body.as_ref().unwrap();
        assert_eq!(sent["publicKey"], json!("pk"));
        assert_eq!(sent["amount"], json!("250.5"));
        assert_eq!(sent["country"], json!("GH"));
        assert_eq!(sent["paymentReference"], json!(session.session_reference));
    }

    #[tokio::test]
    async fn test_missing_public_key() {
        let (seerbit, transport) = provider(ProviderSettings::new(DEFAULT_BASE_URL, "sk"), vec![]);

        let err = seerbit
            .initialize_session(SessionRequest::new("NGN", dec!(10), "a@b.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::Configuration(_)));
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verify_maps_query() {
        let (seerbit, transport) = provider(
            ProviderSettings::new(DEFAULT_BASE_URL, "sk").with_public_key("pk"),
            vec![
                key_response(),
                json!({
                    "status": "SUCCESS",
                    "data": {
                        "code": "00",
                        "payments": {
                            "amount": 250.5,
                            "currency": "NGN",
                            "gatewayMessage": "Successful",
                            "transactionProcessedTime": "2021-06-10 12:33:56.0",
                            "sourceIP": "10.0.0.1",
                            "deviceType": "Desktop"
                        },
                        "customers": {"customerEmail": "a@b.com"}
                    }
                }),
            ],
        );

        let record = seerbit.fetch_transaction("SEBT_abc").await.unwrap();

        assert_eq!(record.amount, dec!(250.5));
        assert_eq!(record.email, "a@b.com");
        assert_eq!(record.meta, json!({"sourceIP": "10.0.0.1", "deviceType": "Desktop"}));
        assert_eq!(record.date, "2021-06-10 12:33:56");
        assert_eq!(record.status, TransactionStatus::Reported("Successful".into()));
        assert!(record.is_successful());

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[1].url, "https://seerbitapi.com/api/v2/payments/query/SEBT_abc");
    }
}
