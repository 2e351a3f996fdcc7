//! Shared fixtures for adapter integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use gateway_core::{
    DeferredNotification, GatewayResult, GatewaySettings, InMemorySessionStore,
    NotificationRegistry, ProviderContext, ProviderSettings, TransactionRecord,
};
use gateway_providers::{default_registry, ReqwestTransport};
use gateway_core::ProviderRegistry;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

pub const SIGNING_KEY: &str = "integration-signing-key";
pub const BASE_URL: &str = "https://pay.example.com";
pub const TTL_SECS: u64 = 900;

/// Counts deferred notifications
#[derive(Default)]
pub struct Recorder {
    calls: AtomicUsize,
}

impl Recorder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeferredNotification for Recorder {
    async fn notify(&self, _record: &TransactionRecord, _payload: &Value) -> GatewayResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Every provider pointed at the mock server
pub fn settings(server: &MockServer) -> GatewaySettings {
    GatewaySettings::new(SIGNING_KEY, BASE_URL)
        .with_session_ttl(TTL_SECS)
        .with_debug(true)
        .with_provider("paystack", ProviderSettings::new(server.uri(), "sk_test_paystack"))
        .with_provider(
            "seerbit",
            ProviderSettings::new(server.uri(), "seerbit-secret").with_public_key("seerbit-public"),
        )
        .with_provider(
            "klasha",
            ProviderSettings::new(server.uri(), "klasha-secret").with_public_key("klasha-public"),
        )
}

/// Registry over a real HTTP transport, plus the `"record"` notification handler
pub fn registry(server: &MockServer) -> (ProviderRegistry, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let transport = ReqwestTransport::new(Some(Duration::from_secs(5))).expect("transport");
    let ctx = ProviderContext::new(
        settings(server),
        Arc::new(transport),
        Arc::new(InMemorySessionStore::new()),
    )
    .with_notifications(NotificationRegistry::with_defaults().with_handler("record", recorder.clone()));

    (default_registry(ctx), recorder)
}
