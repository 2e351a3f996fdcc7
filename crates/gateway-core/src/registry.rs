//! # Provider Registry
//!
//! Static map from provider id to constructor. The provider set is closed:
//! only registered constructors can be resolved, and abstract names never are.

use crate::error::{GatewayError, GatewayResult};
use crate::provider::{BoxedPaymentProvider, ProviderContext};
use std::collections::BTreeMap;

/// Builds an adapter around the shared collaborators
pub type ProviderConstructor = fn(ProviderContext) -> BoxedPaymentProvider;

/// Names that describe the adapter contract rather than a processor
const ABSTRACT_PROVIDERS: &[&str] = &["abstract", "base", "provider"];

/// Resolves provider names to adapters
#[derive(Clone)]
pub struct ProviderRegistry {
    constructors: BTreeMap<&'static str, ProviderConstructor>,
    context: ProviderContext,
}

impl ProviderRegistry {
    /// Create an empty registry sharing `context` with every adapter
    pub fn new(context: ProviderContext) -> Self {
        Self {
            constructors: BTreeMap::new(),
            context,
        }
    }

    /// Register a provider constructor
    pub fn register(&mut self, name: &'static str, constructor: ProviderConstructor) {
        self.constructors.insert(name, constructor);
    }

    /// Register with builder pattern
    pub fn with_provider(mut self, name: &'static str, constructor: ProviderConstructor) -> Self {
        self.register(name, constructor);
        self
    }

    /// Adapter for `name` (case-insensitive)
    pub fn resolve(&self, name: &str) -> GatewayResult<BoxedPaymentProvider> {
        let key = name.trim().to_ascii_lowercase();
        let unsupported = || GatewayError::UnsupportedProvider {
            name: name.to_string(),
        };

        if ABSTRACT_PROVIDERS.contains(&key.as_str()) {
            return Err(unsupported());
        }

        let constructor = self.constructors.get(key.as_str()).ok_or_else(unsupported)?;
        let provider = constructor(self.context.clone());

        if provider.provider_name() != key {
            return Err(unsupported());
        }
        Ok(provider)
    }

    /// Registered provider ids, sorted
    pub fn providers(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_ok()
    }

    pub fn context(&self) -> &ProviderContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewaySettings;
    use crate::error::GatewayResult;
    use crate::provider::PaymentProvider;
    use crate::record::{SessionRecord, SessionRequest, TransactionRecord};
    use crate::store::InMemorySessionStore;
    use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct NoTransport;

    #[async_trait]
    impl HttpTransport for NoTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError::Request("offline".into()))
        }
    }

    struct Named {
        name: &'static str,
        ctx: ProviderContext,
    }

    #[async_trait]
    impl PaymentProvider for Named {
        fn provider_name(&self) -> &'static str {
            self.name
        }

        fn reference_prefix(&self) -> &'static str {
            "TST_"
        }

        fn context(&self) -> &ProviderContext {
            &self.ctx
        }

        async fn open_session(
            &self,
            _reference: &str,
            _request: &SessionRequest,
        ) -> GatewayResult<SessionRecord> {
            unimplemented!()
        }

        async fn fetch_transaction(&self, _reference: &str) -> GatewayResult<TransactionRecord> {
            unimplemented!()
        }
    }

    fn alpha(ctx: ProviderContext) -> BoxedPaymentProvider {
        Arc::new(Named { name: "alpha", ctx })
    }

    fn beta(ctx: ProviderContext) -> BoxedPaymentProvider {
        Arc::new(Named { name: "beta", ctx })
    }

    fn registry() -> ProviderRegistry {
        let ctx = ProviderContext::new(
            GatewaySettings::new("test-signing-key-0123", "http://localhost:8080"),
            Arc::new(NoTransport),
            Arc::new(InMemorySessionStore::new()),
        );
        ProviderRegistry::new(ctx)
            .with_provider("beta", beta)
            .with_provider("alpha", alpha)
            // Registered under a name its adapter does not answer to
            .with_provider("gamma", beta)
    }

    #[test]
    fn test_resolve_registered() {
        let registry = registry();
        for name in ["alpha", "beta"] {
            assert_eq!(registry.resolve(name).unwrap().provider_name(), name);
        }
        assert_eq!(registry.resolve(" ALPHA ").unwrap().provider_name(), "alpha");
    }

    #[test]
    fn test_resolve_unknown_or_abstract() {
        let registry = registry();
        for name in ["paypal", "abstract", "base", "", "gamma"] {
            let err = registry.resolve(name).err().unwrap();
            assert!(
                matches!(err, GatewayError::UnsupportedProvider { name: ref n } if n == name),
                "unexpected error for {:?}: {}",
                name,
                err
            );
        }
    }

    #[test]
    fn test_providers_sorted() {
        let registry = registry();
        assert_eq!(registry.providers(), vec!["alpha", "beta", "gamma"]);
        assert!(registry.contains("beta"));
        assert!(!registry.contains("gamma"));
    }
}
