//! # Paystack
//!
//! Transactions are initialized with the secret key as bearer token. The
//! payer is sent to a signed checkout URL served by this system, where the
//! Paystack inline popup is opened with the returned `access_code`.
//!
//! Paystack works in minor units (kobo): amounts are sent ×100 and read back ÷100.

use crate::session_extra;
use async_trait::async_trait;
use chrono::Utc;
use gateway_core::record::{decimal_to_json, from_minor_units, normalize_timestamp, to_minor_units};
use gateway_core::{
    BoxedPaymentProvider, Channel, GatewayResult, HttpRequest, PaymentProvider, Phase,
    ProviderContext, SessionRecord, SessionRequest, TransactionRecord, TransactionStatus,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const PROVIDER: &str = "paystack";
pub const REFERENCE_PREFIX: &str = "PTK_";
pub const DEFAULT_BASE_URL: &str = "https://api.paystack.co";
pub const DEFAULT_CHANNELS: &[Channel] = &[
    Channel::Card,
    Channel::Bank,
    Channel::Ussd,
    Channel::Qr,
    Channel::MobileMoney,
    Channel::BankTransfer,
];

/// Paystack adapter
pub struct PaystackProvider {
    ctx: ProviderContext,
}

impl PaystackProvider {
    pub fn new(ctx: ProviderContext) -> Self {
        Self { ctx }
    }

    /// Registry constructor
    pub fn boxed(ctx: ProviderContext) -> BoxedPaymentProvider {
        Arc::new(Self::new(ctx))
    }
}

#[async_trait]
impl PaymentProvider for PaystackProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn reference_prefix(&self) -> &'static str {
        REFERENCE_PREFIX
    }

    fn reference_length(&self) -> usize {
        10
    }

    fn context(&self) -> &ProviderContext {
        &self.ctx
    }

    fn session_amount(&self, amount: Decimal) -> Decimal {
        to_minor_units(amount)
    }

    #[instrument(skip(self, request), fields(provider = PROVIDER))]
    async fn open_session(
        &self,
        reference: &str,
        request: &SessionRequest,
    ) -> GatewayResult<SessionRecord> {
        let settings = self.ctx.settings.provider(PROVIDER)?;
        let amount = decimal_to_json(self.session_amount(request.amount));
        let callback_url = self.ctx.settings.callback_url(PROVIDER, reference);
        let channels = self.channels();

        let payload = InitializeRequest {
            email: &request.email,
            amount: amount.clone(),
            currency: &request.currency,
            reference,
            callback_url: &callback_url,
            channels: channels.iter().map(Channel::as_str).collect(),
            metadata: &request.meta,
        };

        debug!("Creating Paystack transaction: amount={} {}", amount, request.currency);

        let body = self
            .ctx
            .expect_success(
                PROVIDER,
                Phase::Initialization,
                HttpRequest::post(
                    settings.endpoint("/transaction/initialize"),
                    serde_json::to_value(&payload)?,
                )
                .bearer(&settings.secret_key),
            )
            .await?;

        let response: InitializeResponse = Phase::Initialization.decode(PROVIDER, body)?;
        let ttl = self.ctx.settings.session_ttl();

        info!(
            "Created Paystack transaction: reference={}, access_code={}",
            reference, response.data.access_code
        );

        let mut extra = session_extra(request, amount, &channels, &callback_url);
        extra.insert(
            "authorization_url".into(),
            json!(response.data.authorization_url),
        );
        if let Some(public_key) = &settings.public_key {
            extra.insert("public_key".into(), json!(public_key));
        }

        Ok(SessionRecord {
            provider: PROVIDER.to_string(),
            session_reference: reference.to_string(),
            payment_reference: response.data.reference,
            checkout_secret: Some(response.data.access_code),
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
                HttpRequest::get(settings.endpoint(&format!("/transaction/verify/{}", reference)))
                    .bearer(&settings.secret_key),
            )
            .await?;

        let transaction: Transaction = Phase::Verification.decode(PROVIDER, unwrap_data(body))?;

        Ok(TransactionRecord {
            email: transaction.customer.email,
            meta: transaction.metadata,
            amount: from_minor_units(transaction.amount),
            currency: transaction.currency,
            reference: reference.to_string(),
            provider: PROVIDER.to_string(),
            status: TransactionStatus::Successful(transaction.status == "success"),
            date: normalize_timestamp(
                transaction
                    .transaction_date
                    .as_deref()
                    .or(transaction.paid_at.as_deref()),
            ),
        })
    }
}

/// Paystack wraps payloads as `{status, message, data}`; accept a bare payload too
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.get("data").is_some_and(Value::is_object) => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

// =============================================================================
// Paystack API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct InitializeRequest<'a> {
    email: &'a str,
    /// Kobo
    amount: Value,
    currency: &'a str,
    reference: &'a str,
    callback_url: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    channels: Vec<&'static str>,
    metadata: &'a Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct InitializeResponse {
    data: InitializeData,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    access_code: String,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    #[serde(default)]
    status: String,
    /// Kobo
    amount: Decimal,
    currency: String,
    customer: Customer,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    transaction_date: Option<String>,
    #[serde(default)]
    paid_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Customer {
    email: String,
}
