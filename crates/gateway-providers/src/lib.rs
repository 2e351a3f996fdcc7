//! # gateway-providers
//!
//! Concrete payment provider adapters for payment-gateways-rs.
//!
//! | Provider | Reference | Checkout                                  |
//! |----------|-----------|-------------------------------------------|
//! | Paystack | `PTK_…`   | signed URL, inline popup with access code |
//! | Seerbit  | `SEBT_…`  | hosted redirect link                      |
//! | Klasha   | `KSA_…`   | signed URL, inline widget                 |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gateway_core::{InMemorySessionStore, ProviderContext, SessionRequest};
//! use gateway_providers::{default_registry, settings_from_env, ReqwestTransport};
//!
//! let settings = settings_from_env()?;
//! let transport = ReqwestTransport::new(settings.request_timeout())?;
//! let ctx = ProviderContext::new(
//!     settings,
//!     Arc::new(transport),
//!     Arc::new(InMemorySessionStore::new()),
//! );
//! let registry = default_registry(ctx);
//!
//! let session = registry
//!     .resolve("paystack")?
//!     .initialize_session(SessionRequest::new("NGN", dec!(50), "payer@example.com"))
//!     .await?;
//! ```

pub mod config;
pub mod http;
pub mod klasha;
pub mod paystack;
pub mod seerbit;

use gateway_core::record::Channel;
use gateway_core::{ProviderConstructor, ProviderContext, ProviderRegistry, SessionRequest};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// Re-exports
pub use config::{apply_default_channels, settings_from_env};
pub use http::ReqwestTransport;
pub use klasha::KlashaProvider;
pub use paystack::PaystackProvider;
pub use seerbit::SeerbitProvider;

/// The closed set of supported processors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Paystack,
    Seerbit,
    Klasha,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::Paystack,
        ProviderKind::Seerbit,
        ProviderKind::Klasha,
    ];

    /// Provider id used in routes, config keys and `{ID}_*` env vars
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Paystack => paystack::PROVIDER,
            ProviderKind::Seerbit => seerbit::PROVIDER,
            ProviderKind::Klasha => klasha::PROVIDER,
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Paystack => paystack::DEFAULT_BASE_URL,
            ProviderKind::Seerbit => seerbit::DEFAULT_BASE_URL,
            ProviderKind::Klasha => klasha::DEFAULT_BASE_URL,
        }
    }

    pub fn default_channels(&self) -> &'static [Channel] {
        match self {
            ProviderKind::Paystack => paystack::DEFAULT_CHANNELS,
            ProviderKind::Seerbit => seerbit::DEFAULT_CHANNELS,
            ProviderKind::Klasha => klasha::DEFAULT_CHANNELS,
        }
    }

    pub fn constructor(&self) -> ProviderConstructor {
        match self {
            ProviderKind::Paystack => PaystackProvider::boxed,
            ProviderKind::Seerbit => SeerbitProvider::boxed,
            ProviderKind::Klasha => KlashaProvider::boxed,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| format!("unknown provider: {}", s))
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registry with every built-in adapter
pub fn default_registry(ctx: ProviderContext) -> ProviderRegistry {
    ProviderKind::ALL
        .into_iter()
        .fold(ProviderRegistry::new(ctx), |registry, kind| {
            registry.with_provider(kind.name(), kind.constructor())
        })
}

/// Fields every adapter keeps in `SessionRecord::extra`
pub(crate) fn session_extra(
    request: &SessionRequest,
    amount: Value,
    channels: &BTreeSet<Channel>,
    callback_url: &str,
) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("amount".into(), amount);
    extra.insert("currency".into(), json!(request.currency));
    extra.insert("email".into(), json!(request.email));
    extra.insert("channels".into(), json!(channels));
    extra.insert("callback_url".into(), json!(callback_url));
    if !request.meta.is_empty() {
        extra.insert("meta".into(), Value::Object(request.meta.clone()));
    }
    extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("Paystack".parse::<ProviderKind>(), Ok(ProviderKind::Paystack));
        assert_eq!(" klasha ".parse::<ProviderKind>(), Ok(ProviderKind::Klasha));
        assert!("stripe".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Seerbit.to_string(), "seerbit");
    }

    #[test]
    fn test_reference_prefixes_are_distinct() {
        let prefixes = BTreeSet::from([
            paystack::REFERENCE_PREFIX,
            seerbit::REFERENCE_PREFIX,
            klasha::REFERENCE_PREFIX,
        ]);
        assert_eq!(prefixes.len(), ProviderKind::ALL.len());
    }

    #[test]
    fn test_session_extra_shape() {
        let request = SessionRequest::new("NGN", rust_decimal::Decimal::TEN, "a@b.com")
            .with_meta("order_id", 7);
        let extra = session_extra(
            &request,
            json!(1000),
            &BTreeSet::from([Channel::Ussd, Channel::Card]),
            "https://pay.example.com/callback/paystack/PTK_x",
        );

        assert_eq!(extra["amount"], json!(1000));
        assert_eq!(extra["channels"], json!(["card", "ussd"]));
        assert_eq!(extra["meta"], json!({"order_id": 7}));
    }
}
