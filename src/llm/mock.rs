//! Deterministic in-process resolver.
//!
//! Echoes the last user message for completions and returns a scripted intent
//! for extraction. Used for local runs (`LLM_BACKEND=mock`) and as the test
//! double for the gateway flows.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gateway_types::{Entities, IntentResolution, Message, Role, Usage};

use super::{Completion, CompletionRequest, LlmResolver, ResolverError};

/// Intent returned when nothing else was scripted
pub const DEFAULT_MOCK_INTENT: &str = "list_intents";

pub struct MockResolver {
    reply: Option<String>,
    intent: IntentResolution,
    failure: Option<ResolverError>,
    delay: Option<Duration>,
    complete_calls: AtomicUsize,
    extract_calls: AtomicUsize,
}

impl MockResolver {
    pub fn new() -> Self {
        Self {
            reply: None,
            intent: IntentResolution::new(DEFAULT_MOCK_INTENT, Entities::new()),
            failure: None,
            delay: None,
            complete_calls: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
        }
    }

    /// Answer every completion with `reply` instead of echoing
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    /// Script the intent returned by extraction
    pub fn with_intent(mut self, intent: impl Into<String>, entities: Entities) -> Self {
        self.intent = IntentResolution::new(intent, entities);
        self
    }

    /// Fail every call with `error`
    pub fn failing_with(mut self, error: ResolverError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Sleep before answering, to exercise deadlines
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    async fn pause_and_check(&self) -> Result<(), ResolverError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn word_count(messages: &[Message]) -> u32 {
    messages
        .iter()
        .map(|m| m.content.split_whitespace().count() as u32)
        .sum()
}

#[async_trait]
impl LlmResolver for MockResolver {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ResolverError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_and_check().await?;
        request.validate()?;

        let content = match &self.reply {
            Some(reply) => reply.clone(),
            None => request
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default(),
        };
        let reply = vec![Message::assistant(content)];
        let prompt_tokens = word_count(&request.messages);
        let completion_tokens = word_count(&reply);

        Ok(Completion {
            messages: reply,
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
                cost_units: None,
            }),
        })
    }

    async fn extract_intent(
        &self,
        _text: &str,
        _session_id: &str,
    ) -> Result<IntentResolution, ResolverError> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_and_check().await?;
        Ok(self.intent.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn provider_name(&self) -> &str {
        "Mock"
    }
}
