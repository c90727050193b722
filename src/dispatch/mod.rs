//! Intent Dispatch
//!
//! Maps a resolved intent name to a registered handler and normalizes the
//! handler's reply into a [`DispatchResult`].
//!
//! ## Error policy
//!
//! - No handler for the intent → [`DispatchError::Unroutable`]; no handler runs.
//! - Handler refuses on a business rule → [`DispatchError::Rejected`] (caller-facing).
//! - Handler breaks → [`DispatchError::Failed`] (opaque to the caller).
//!
//! The registry is built at startup and shared read-only afterwards. The set of
//! intents belongs to the business modules that register them, so the
//! orchestrator never needs to change when handlers do.

mod handlers;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gateway_types::{DispatchResult, Entities};
use thiserror::Error;

pub use handlers::{FnHandler, ListIntentsHandler, LIST_INTENTS};

/// Error raised by a handler
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Business-rule refusal with an explanation fit for the caller
    #[error("{reason}")]
    Rejected { reason: String },

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Error raised by the dispatcher
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("no handler registered for intent '{intent}'")]
    Unroutable { intent: String },

    #[error("intent '{intent}' rejected: {reason}")]
    Rejected { intent: String, reason: String },

    #[error("handler for intent '{intent}' failed")]
    Failed {
        intent: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Raw reply from a handler, before defaults are applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerReply {
    pub status: Option<String>,
    pub message: Option<String>,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl HandlerReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Trait implemented by every intent handler
#[async_trait]
pub trait IntentHandler: Send + Sync {
    /// Intent name this handler serves
    fn intent(&self) -> &str;

    /// Human-readable summary for catalogs and logs
    fn description(&self) -> &str {
        ""
    }

    /// Execute the intent for `user_id`
    async fn handle(
        &self,
        entities: &Entities,
        user_id: &str,
    ) -> Result<HandlerReply, HandlerError>;
}

/// Registry of intent handlers keyed by intent name
#[derive(Default)]
pub struct IntentRegistry {
    handlers: HashMap<String, Arc<dyn IntentHandler>>,
}

impl IntentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. A later registration for the same intent replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn IntentHandler>) {
        let key = handler.intent().to_string();
        if self.handlers.contains_key(&key) {
            tracing::warn!("Intent handler registration overwriting existing handler: {}", key);
        }
        self.handlers.insert(key, handler);
    }

    /// Builder-style registration
    pub fn with(mut self, handler: Arc<dyn IntentHandler>) -> Self {
        self.register(handler);
        self
    }

    /// Add the built-in `list_intents` handler, reporting every intent registered so far.
    pub fn with_catalog(mut self) -> Self {
        let mut catalog: Vec<(String, String)> = self
            .handlers
            .values()
            .map(|h| (h.intent().to_string(), h.description().to_string()))
            .collect();
        catalog.push((
            LIST_INTENTS.to_string(),
            ListIntentsHandler::DESCRIPTION.to_string(),
        ));
        catalog.sort();
        catalog.dedup_by(|a, b| a.0 == b.0);
        self.register(Arc::new(ListIntentsHandler::new(catalog)));
        self
    }

    pub fn get(&self, intent: &str) -> Option<Arc<dyn IntentHandler>> {
        self.handlers.get(intent).cloned()
    }

    /// Registered intent names, sorted
    pub fn intents(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Routes intents through the registry and normalizes results
#[derive(Clone)]
pub struct IntentDispatcher {
    registry: Arc<IntentRegistry>,
}

impl IntentDispatcher {
    pub fn new(registry: Arc<IntentRegistry>) -> Self {
        if registry.is_empty() {
            tracing::warn!(
                "IntentDispatcher initialized with no intents; every intent is unroutable"
            );
        } else {
            tracing::info!("IntentDispatcher initialized with {} intents", registry.len());
        }
        Self { registry }
    }

    pub async fn dispatch(
        &self,
        intent: &str,
        entities: &Entities,
        user_id: &str,
    ) -> Result<DispatchResult, DispatchError> {
        let handler = self
            .registry
            .get(intent)
            .ok_or_else(|| DispatchError::Unroutable {
                intent: intent.to_string(),
            })?;

        tracing::debug!(intent, entity_count = entities.len(), "dispatching intent");

        let reply = handler
            .handle(entities, user_id)
            .await
            .map_err(|err| match err {
                HandlerError::Rejected { reason } => DispatchError::Rejected {
                    intent: intent.to_string(),
                    reason,
                },
                HandlerError::Failed(source) => DispatchError::Failed {
                    intent: intent.to_string(),
                    source,
                },
            })?;

        Ok(DispatchResult::normalized(
            intent,
            reply.status,
            reply.message,
            reply.data,
        ))
    }
}
