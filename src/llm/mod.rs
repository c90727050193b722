//! LLM Resolver
//!
//! Unified interface over language-model backends. Two capabilities:
//! conversational completion and intent/entity extraction. Concrete backends
//! are selected at startup (see [`backend::LlmBackend`]) and injected into the
//! gateway as `Arc<dyn LlmResolver>`.

pub mod backend;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use gateway_types::{IntentResolution, Message, Mode, Role, Usage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backend::{create_resolver, LlmBackend};
pub use mock::MockResolver;
pub use openai::OpenAiResolver;

/// Accepted sampling temperature range
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// The request itself is unusable (bad mode/parameter combination).
    #[error("{0}")]
    InvalidParameters(String),

    /// Transport or provider failure, including unparsable provider output.
    #[error("{0}")]
    Backend(String),
}

impl From<reqwest::Error> for ResolverError {
    fn from(err: reqwest::Error) -> Self {
        ResolverError::Backend(format!("transport error: {}", err))
    }
}

/// Optional generation overrides, passed through to the backend untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Input to the completion capability
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub mode: Mode,
    pub params: GenerationParams,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, mode: Mode) -> Self {
        Self {
            messages,
            mode,
            params: GenerationParams::default(),
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Reject mode/parameter combinations no backend can serve.
    pub fn validate(&self) -> Result<(), ResolverError> {
        if let Some(t) = self.params.temperature {
            if !TEMPERATURE_RANGE.contains(&t) {
                return Err(ResolverError::InvalidParameters(format!(
                    "temperature must be between {} and {}, got {}",
                    TEMPERATURE_RANGE.start(),
                    TEMPERATURE_RANGE.end(),
                    t
                )));
            }
        }
        if self.params.max_tokens == Some(0) {
            return Err(ResolverError::InvalidParameters(
                "max_tokens must be at least 1".to_string(),
            ));
        }
        if let Some(model) = &self.params.model {
            if model.trim().is_empty() {
                return Err(ResolverError::InvalidParameters(
                    "model must not be blank".to_string(),
                ));
            }
        }
        let has_user_turn = self
            .messages
            .iter()
            .any(|m| m.role == Role::User && !m.content.trim().is_empty());
        if !has_user_turn {
            return Err(ResolverError::InvalidParameters(format!(
                "{} mode requires at least one non-empty user message",
                self.mode
            )));
        }
        Ok(())
    }
}

/// Output of the completion capability
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub messages: Vec<Message>,
    pub usage: Option<Usage>,
}

/// Tool/function definition used to force structured output from a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's parameters
    pub parameters: serde_json::Value,
}

/// The tool every backend uses for intent extraction.
pub fn intent_tool() -> ToolDefinition {
    ToolDefinition {
        name: "route_intent".to_string(),
        description: "Classify the user's request into exactly one intent and extract the \
                      named entities that support it."
            .to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "intent": {
                    "type": "string",
                    "description": "snake_case intent identifier, e.g. create_order"
                },
                "entities": {
                    "type": "object",
                    "description": "entity name to extracted value",
                    "additionalProperties": true
                }
            },
            "required": ["intent", "entities"]
        }),
    }
}

/// Unified resolver interface for every backend
#[async_trait]
pub trait LlmResolver: Send + Sync {
    /// Continue a conversation. Fails with `InvalidParameters` for unusable
    /// requests and `Backend` for transport/provider failures.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ResolverError>;

    /// Extract exactly one intent and its entities from free text.
    /// `session_id` is forwarded to the provider for conversational continuity.
    async fn extract_intent(
        &self,
        text: &str,
        session_id: &str,
    ) -> Result<IntentResolution, ResolverError>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}
