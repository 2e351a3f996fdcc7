//! # gateway-core
//!
//! Core types and traits for the payment-gateways engine.
//!
//! This crate provides:
//! - `PaymentProvider` trait for implementing payment processor adapters
//! - `ProviderRegistry` for resolving provider names to adapters
//! - `SessionRecord` and `TransactionRecord`, the canonical records
//! - `SessionStore` with compute-once caching of checkout sessions
//! - `NotificationRegistry` for deferred, run-once payment notifications
//! - `UrlSigner` for tamper-evident checkout URLs
//! - `GatewayError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use gateway_core::{CallbackHandle, SessionRequest};
//! use rust_decimal_macros::dec;
//!
//! let provider = registry.resolve("paystack")?;
//!
//! // Create a checkout session and redirect the payer to `checkout_url`
//! let session = provider
//!     .initialize_session(
//!         SessionRequest::new("NGN", dec!(50), "payer@example.com")
//!             .with_callback(CallbackHandle::new("fulfil-order", json!({"order_id": 42}))),
//!     )
//!     .await?;
//!
//! // Later, from the callback route
//! let transaction = provider.confirm_session(&session.session_reference).await?;
//! ```

pub mod config;
pub mod error;
pub mod notification;
pub mod provider;
pub mod record;
pub mod reference;
pub mod registry;
pub mod signing;
pub mod store;
pub mod transport;

// Re-exports for convenience
pub use config::{GatewaySettings, ProviderSettings, RouteSettings, SessionSettings};
pub use error::{GatewayError, GatewayResult};
pub use notification::{
    CallbackHandle, DeferredNotification, LoggingNotification, NotificationRegistry, LOG_HANDLER,
};
pub use provider::{BoxedPaymentProvider, PaymentProvider, Phase, ProviderContext};
pub use record::{
    Channel, SessionRecord, SessionRequest, TransactionRecord, TransactionStatus,
};
pub use reference::generate_reference;
pub use registry::{ProviderConstructor, ProviderRegistry};
pub use signing::{SignedCheckout, UrlSigner};
pub use store::{InMemorySessionStore, SessionFactory, SessionStore, SharedSessionStore};
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, SharedTransport, TransportError,
};
