//! # Canonical Records
//!
//! The data contract every provider adapter must produce:
//! `SessionRecord` for an initialized checkout and `TransactionRecord`
//! for a verified payment.

use crate::notification::CallbackHandle;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Timestamp layout used by `TransactionRecord::date`
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A payment method enabled for a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Card,
    Bank,
    BankTransfer,
    Ussd,
    Qr,
    MobileMoney,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Card => "card",
            Channel::Bank => "bank",
            Channel::BankTransfer => "bank_transfer",
            Channel::Ussd => "ussd",
            Channel::Qr => "qr",
            Channel::MobileMoney => "mobile_money",
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(Channel::Card),
            "bank" => Ok(Channel::Bank),
            "bank_transfer" => Ok(Channel::BankTransfer),
            "ussd" => Ok(Channel::Ussd),
            "qr" => Ok(Channel::Qr),
            "mobile_money" => Ok(Channel::MobileMoney),
            other => Err(format!("unknown channel: {}", other)),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller input for `PaymentProvider::initialize_session`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    /// ISO 4217 code, e.g. "NGN"
    pub currency: String,

    /// Amount in the major currency unit
    pub amount: Decimal,

    /// Payer email
    pub email: String,

    /// Free-form metadata forwarded to the provider
    #[serde(default)]
    pub meta: Map<String, Value>,

    /// Reuse an existing reference instead of minting a new one.
    ///
    /// A reused reference that is still cached returns the cached session,
    /// whatever the amount or email on this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Deferred notification to run once the payment is verified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<CallbackHandle>,
}

impl SessionRequest {
    pub fn new(currency: impl Into<String>, amount: Decimal, email: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            amount,
            email: email.into(),
            meta: Map::new(),
            reference: None,
            callback: None,
        }
    }

    /// Builder: add a metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Builder: pin the session reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Builder: attach a deferred notification
    pub fn with_callback(mut self, callback: CallbackHandle) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// An initialized checkout session. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Provider id (e.g. "paystack")
    pub provider: String,

    /// Provider-prefixed unique reference
    pub session_reference: String,

    /// Payment-side id when the provider issues its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,

    /// Opaque token the checkout page hands to the provider widget
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_secret: Option<String>,

    /// Where the payer is redirected
    pub checkout_url: String,

    /// Lifetime in seconds; equals the session store TTL
    pub expires: u64,

    /// Provider-specific fields (amount, currency, email, channels, callback_url)
    #[serde(default)]
    pub extra: Map<String, Value>,

    /// Deferred notification captured at creation time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deferred_callback: Option<CallbackHandle>,

    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Amount stored in `extra`, as sent to the provider
    pub fn amount(&self) -> Option<Decimal> {
        self.extra.get("amount").and_then(json_to_decimal)
    }

    /// Email stored in `extra`
    pub fn email(&self) -> Option<&str> {
        self.extra.get("email").and_then(Value::as_str)
    }

    /// Channels stored in `extra`
    pub fn channels(&self) -> BTreeSet<Channel> {
        self.extra
            .get("channels")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .filter_map(|c| c.parse().ok())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Outcome reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Provider reports a boolean outcome
    Successful(bool),
    /// Provider reports a free-form status string
    Reported(String),
}

impl TransactionStatus {
    pub fn is_successful(&self) -> bool {
        match self {
            TransactionStatus::Successful(ok) => *ok,
            TransactionStatus::Reported(status) => {
                let status = status.trim();
                ["success", "successful", "approved"]
                    .iter()
                    .any(|s| status.eq_ignore_ascii_case(s))
            }
        }
    }
}

/// A verified payment. Produced per verification call and never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub email: String,
    /// Upstream customer/device fields
    pub meta: Value,
    /// Amount in the major currency unit
    pub amount: Decimal,
    pub currency: String,
    pub reference: String,
    pub provider: String,
    pub status: TransactionStatus,
    /// `YYYY-MM-DD HH:MM:SS`
    pub date: String,
}

impl TransactionRecord {
    pub fn is_successful(&self) -> bool {
        self.status.is_successful()
    }
}

/// Scale a major-unit amount to minor units (kobo, cents)
pub fn to_minor_units(amount: Decimal) -> Decimal {
    (amount * Decimal::ONE_HUNDRED).normalize()
}

/// Scale a minor-unit amount back to the major unit
pub fn from_minor_units(amount: Decimal) -> Decimal {
    (amount / Decimal::ONE_HUNDRED).normalize()
}

/// Render a decimal as a JSON number, integral when possible
pub fn decimal_to_json(amount: Decimal) -> Value {
    let amount = amount.normalize();
    if amount.fract().is_zero() {
        if let Some(int) = amount.to_i64() {
            return Value::from(int);
        }
    }
    amount
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(amount.to_string()))
}

/// Read a JSON number or numeric string as a decimal
pub fn json_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            if let Some(int) = n.as_i64() {
                Some(Decimal::from(int))
            } else {
                Decimal::from_str(&n.to_string()).ok()
            }
        }
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Normalize an upstream timestamp to `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// Unparseable or missing timestamps fall back to the current time.
pub fn normalize_timestamp(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .unwrap_or_else(Utc::now)
        .format(DATE_FORMAT)
        .to_string()
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
