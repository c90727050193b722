//! Handler adapters and the built-in catalog handler.

use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use gateway_types::Entities;

use super::{HandlerError, HandlerReply, IntentHandler};

/// Intent served by [`ListIntentsHandler`]
pub const LIST_INTENTS: &str = "list_intents";

type HandlerFuture = BoxFuture<'static, Result<HandlerReply, HandlerError>>;
type HandlerFn = dyn Fn(Entities, String) -> HandlerFuture + Send + Sync;

/// Wraps an async closure as an [`IntentHandler`].
pub struct FnHandler {
    intent: String,
    description: String,
    func: Box<HandlerFn>,
}

impl FnHandler {
    pub fn new<F, Fut>(intent: impl Into<String>, func: F) -> Self
    where
        F: Fn(Entities, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HandlerReply, HandlerError>> + Send + 'static,
    {
        Self {
            intent: intent.into(),
            description: String::new(),
            func: Box::new(move |entities: Entities, user_id: String| {
                func(entities, user_id).boxed()
            }),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl IntentHandler for FnHandler {
    fn intent(&self) -> &str {
        &self.intent
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn handle(
        &self,
        entities: &Entities,
        user_id: &str,
    ) -> Result<HandlerReply, HandlerError> {
        (self.func)(entities.clone(), user_id.to_string()).await
    }
}

/// Reports the intents the gateway can route.
pub struct ListIntentsHandler {
    catalog: Vec<(String, String)>,
}

impl ListIntentsHandler {
    pub const DESCRIPTION: &'static str = "List the intents this gateway can route";

    /// `catalog` holds (intent, description) pairs in display order.
    pub fn new(catalog: Vec<(String, String)>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl IntentHandler for ListIntentsHandler {
    fn intent(&self) -> &str {
        LIST_INTENTS
    }

    fn description(&self) -> &str {
        Self::DESCRIPTION
    }

    async fn handle(
        &self,
        _entities: &Entities,
        _user_id: &str,
    ) -> Result<HandlerReply, HandlerError> {
        let intents: Vec<serde_json::Value> = self
            .catalog
            .iter()
            .map(|(intent, description)| {
                serde_json::json!({"intent": intent, "description": description})
            })
            .collect();
        Ok(HandlerReply::new()
            .with_message(format!("{} intents available.", intents.len()))
            .with_field("intents", serde_json::Value::Array(intents)))
    }
}
