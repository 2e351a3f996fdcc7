//! # Deferred Notifications
//!
//! A caller attaches a `CallbackHandle` when a session is created. The handle is
//! plain data (handler id plus JSON payload) stored alongside the session, so it
//! survives serialization and process restarts. On successful verification the
//! handle is resolved against a `NotificationRegistry` and the handler runs once.

use crate::error::{GatewayError, GatewayResult};
use crate::record::TransactionRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Serializable reference to a registered notification handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackHandle {
    /// Id the handler was registered under
    pub handler: String,
    /// Caller context handed back to the handler (order id, user id, ...)
    #[serde(default)]
    pub payload: Value,
}

impl CallbackHandle {
    pub fn new(handler: impl Into<String>, payload: Value) -> Self {
        Self {
            handler: handler.into(),
            payload,
        }
    }
}

/// Unit of work run after a payment is verified.
///
/// Errors returned here propagate out of `confirm_transaction`.
#[async_trait]
pub trait DeferredNotification: Send + Sync {
    async fn notify(&self, record: &TransactionRecord, payload: &Value) -> GatewayResult<()>;
}

/// Handler that only logs the confirmation
pub struct LoggingNotification;

#[async_trait]
impl DeferredNotification for LoggingNotification {
    async fn notify(&self, record: &TransactionRecord, payload: &Value) -> GatewayResult<()> {
        info!(
            "Payment verified: provider={}, reference={}, amount={} {}, successful={}, payload={}",
            record.provider,
            record.reference,
            record.amount,
            record.currency,
            record.is_successful(),
            payload
        );
        Ok(())
    }
}

/// Id of the built-in `LoggingNotification`
pub const LOG_HANDLER: &str = "log";

/// Registry of notification handlers, keyed by id
#[derive(Clone, Default)]
pub struct NotificationRegistry {
    handlers: HashMap<String, Arc<dyn DeferredNotification>>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `"log"` handler
    pub fn with_defaults() -> Self {
        Self::new().with_handler(LOG_HANDLER, Arc::new(LoggingNotification))
    }

    /// Register a handler
    pub fn register(&mut self, id: impl Into<String>, handler: Arc<dyn DeferredNotification>) {
        self.handlers.insert(id.into(), handler);
    }

    /// Register with builder pattern
    pub fn with_handler(mut self, id: impl Into<String>, handler: Arc<dyn DeferredNotification>) -> Self {
        self.register(id, handler);
        self
    }

    pub fn contains(&self, id: &str) -> bool {
        self.handlers.contains_key(id)
    }

    /// Fail early when a handle names no registered handler
    pub fn ensure_known(&self, handle: Option<&CallbackHandle>) -> GatewayResult<()> {
        match handle {
            Some(h) if !self.contains(&h.handler) => Err(GatewayError::Notification(format!(
                "no handler registered under '{}'",
                h.handler
            ))),
            _ => Ok(()),
        }
    }

    /// Run the handler named by `handle`, consuming it
    pub async fn dispatch(
        &self,
        handle: Option<CallbackHandle>,
        record: &TransactionRecord,
    ) -> GatewayResult<()> {
        let Some(handle) = handle else {
            return Ok(());
        };

        let handler = self.handlers.get(&handle.handler).ok_or_else(|| {
            GatewayError::Notification(format!(
                "no handler registered under '{}'",
                handle.handler
            ))
        })?;

        debug!(
            "Dispatching deferred notification: handler={}, reference={}",
            handle.handler, record.reference
        );
        handler.notify(record, &handle.payload).await
    }
}
