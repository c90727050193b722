//! Gateway Types - wire-level data structures for the semantic gateway
//!
//! This crate holds the request/response envelopes exchanged with callers and
//! the intermediate values passed between the resolver and the dispatcher.
//!
//! ## Contents
//!
//! - Conversational turns (`Message`, `Role`, `MessageType`)
//! - Modern envelopes (`RequestPayload`, `ResponsePayload`, `Metadata`, `Usage`)
//! - Legacy envelopes (`LegacyRequest`, `ProcessRequestOutput`)
//! - Intent plumbing (`IntentResolution`, `Entities`, `DispatchResult`)
//!
//! All values are request-scoped: created when a request enters the gateway
//! and dropped when the response leaves it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported for a dispatch when the handler did not set one.
pub const DEFAULT_STATUS: &str = "success";

// ============================================================================
// ERRORS
// ============================================================================

/// Shape problems detected while interpreting an incoming payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("Request must contain either 'input' or 'messages'")]
    MissingMessages,
}

// ============================================================================
// MESSAGES
// ============================================================================

/// Content kind carried by a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Json,
}

/// Speaker of a conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversational turn. Order within a request is conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type", default)]
    pub kind: MessageType,
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a plain-text message
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            kind: MessageType::Text,
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }
}

// ============================================================================
// MODERN ENVELOPES
// ============================================================================

/// Interaction mode requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Chat,
    Command,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Chat => "chat",
            Mode::Command => "command",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request context supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub mode: Mode,
    /// Client-supplied timestamp, echoed untouched. Filled by the server at
    /// response construction only when absent.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Metadata {
    pub fn new(session_id: impl Into<String>, user_id: impl Into<String>, mode: Mode) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            mode,
            timestamp: None,
        }
    }

    /// Return the metadata with `timestamp` set to `now` if the caller left it empty.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        let missing = self
            .timestamp
            .as_deref()
            .map(|ts| ts.is_empty())
            .unwrap_or(true);
        if missing {
            self.timestamp = Some(now.to_rfc3339_opts(SecondsFormat::Micros, true));
        }
        self
    }
}

/// Inbound request for the messages-based flow.
///
/// Either `messages` (non-empty) or the legacy `input` string must be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(default)]
    pub messages: Option<Vec<Message>>,
    #[serde(default)]
    pub input: Option<String>,
    pub metadata: Metadata,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl RequestPayload {
    /// Payload carrying an explicit conversation
    pub fn from_messages(messages: Vec<Message>, metadata: Metadata) -> Self {
        Self {
            messages: Some(messages),
            input: None,
            metadata,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Payload carrying only the legacy free-text `input`
    pub fn from_input(input: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            messages: None,
            input: Some(input.into()),
            metadata,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Resolve the conversation to send to the resolver.
    ///
    /// A non-empty `messages` list wins; otherwise a non-empty `input` is promoted
    /// to a single user text message.
    pub fn effective_messages(&self) -> Result<Vec<Message>, TypesError> {
        if let Some(messages) = self.messages.as_ref().filter(|m| !m.is_empty()) {
            return Ok(messages.clone());
        }
        match self.input.as_deref() {
            Some(input) if !input.is_empty() => Ok(vec![Message::user(input)]),
            _ => Err(TypesError::MissingMessages),
        }
    }
}

/// Token and cost accounting reported by a backend. Opaque to the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_units: Option<f64>,
}

/// Outbound response for the messages-based flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub messages: Vec<Message>,
    pub metadata: Metadata,
    #[serde(default)]
    pub usage: Option<Usage>,
}

// ============================================================================
// LEGACY ENVELOPES
// ============================================================================

/// Inbound request for the text-based legacy flow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRequest {
    pub text: String,
    pub session_id: String,
    pub user_id: String,
}

/// Outbound response for the legacy flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRequestOutput {
    pub status: String,
    pub message: String,
    pub intent: String,
    pub data: DispatchResult,
    pub request_id: String,
}

// ============================================================================
// INTENTS
// ============================================================================

/// Extracted entities keyed by name
pub type Entities = BTreeMap<String, serde_json::Value>;

/// Intent and entities extracted from free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResolution {
    pub intent: String,
    #[serde(default)]
    pub entities: Entities,
}

impl IntentResolution {
    pub fn new(intent: impl Into<String>, entities: Entities) -> Self {
        Self {
            intent: intent.into(),
            entities,
        }
    }
}

/// Normalized outcome of an intent handler.
///
/// `status` and `message` are always present; anything else the handler
/// returned travels in `payload` and is flattened into the JSON object.
/// `payload` never holds `status` or `message` keys, so the encoded object
/// carries each exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub status: String,
    pub message: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl DispatchResult {
    /// Build a result, backfilling `status` and `message` when the handler left them out.
    ///
    /// String `status`/`message` entries in `payload` are used when the explicit
    /// value is absent; any other value under those keys is dropped.
    pub fn normalized(
        intent: &str,
        status: Option<String>,
        message: Option<String>,
        mut payload: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let payload_status = string_entry(payload.remove("status"));
        let payload_message = string_entry(payload.remove("message"));
        Self {
            status: status
                .or(payload_status)
                .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            message: message
                .or(payload_message)
                .unwrap_or_else(|| default_message(intent)),
            payload,
        }
    }
}

fn string_entry(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    }
}

/// Message used when a handler does not describe its own outcome
pub fn default_message(intent: &str) -> String {
    format!("Action for intent '{}' completed.", intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn metadata() -> Metadata {
        Metadata::new("s-1", "u-1", Mode::Chat)
    }

    #[test]
    fn input_is_promoted_to_single_user_message() {
        let payload = RequestPayload::from_input("hello", metadata());
        let messages = payload.effective_messages().unwrap();
        assert_eq!(messages, vec![Message::user("hello")]);
        assert_eq!(messages[0].kind, MessageType::Text);
    }

    #[test]
    fn messages_take_precedence_over_input() {
        let mut payload =
            RequestPayload::from_messages(vec![Message::user("from messages")], metadata());
        payload.input = Some("from input".into());
        let messages = payload.effective_messages().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "from messages");
    }

    #[test]
    fn empty_messages_fall_back_to_input() {
        let mut payload = RequestPayload::from_messages(vec![], metadata());
        payload.input = Some("fallback".into());
        assert_eq!(
            payload.effective_messages().unwrap(),
            vec![Message::user("fallback")]
        );
    }

    #[test]
    fn missing_messages_and_input_is_malformed() {
        let payload = RequestPayload::from_messages(vec![], metadata());
        assert_eq!(
            payload.effective_messages(),
            Err(TypesError::MissingMessages)
        );

        let payload = RequestPayload::from_input("", metadata());
        assert_eq!(
            payload.effective_messages(),
            Err(TypesError::MissingMessages)
        );
    }

    #[test]
    fn stamped_fills_missing_timestamp_only() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let filled = metadata().stamped(now);
        assert_eq!(filled.timestamp.as_deref(), Some("2024-05-01T12:00:00.000000Z"));

        let mut supplied = metadata();
        supplied.timestamp = Some("client-clock".into());
        assert_eq!(
            supplied.stamped(now).timestamp.as_deref(),
            Some("client-clock")
        );
    }

    #[test]
    fn request_payload_deserializes_wire_shape() {
        let payload: RequestPayload = serde_json::from_value(json!({
            "messages": [{"type": "text", "role": "user", "content": "hi"}],
            "metadata": {"session_id": "s", "user_id": "u", "mode": "command"},
            "temperature": 0.2
        }))
        .unwrap();
        assert_eq!(payload.metadata.mode, Mode::Command);
        assert_eq!(payload.metadata.timestamp, None);
        assert_eq!(payload.temperature, Some(0.2));
        assert_eq!(payload.messages.unwrap()[0].role, Role::User);
    }

    #[test]
    fn message_type_defaults_to_text() {
        let message: Message =
            serde_json::from_value(json!({"role": "assistant", "content": "ok"})).unwrap();
        assert_eq!(message.kind, MessageType::Text);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "text", "role": "assistant", "content": "ok"})
        );
    }

    #[test]
    fn dispatch_result_backfills_defaults() {
        let result = DispatchResult::normalized("create_order", None, None, Default::default());
        assert_eq!(result.status, DEFAULT_STATUS);
        assert!(result.message.contains("create_order"));
    }

    #[test]
    fn dispatch_result_flattens_payload() {
        let mut payload = serde_json::Map::new();
        payload.insert("order_id".into(), json!(42));
        let result = DispatchResult::normalized(
            "create_order",
            Some("pending".into()),
            Some("queued".into()),
            payload,
        );
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "pending", "message": "queued", "order_id": 42})
        );
    }

    #[test]
    fn dispatch_result_payload_cannot_repeat_reserved_keys() {
        let mut payload = serde_json::Map::new();
        payload.insert("status".into(), json!(3));
        payload.insert("message".into(), json!("from payload"));
        payload.insert("id".into(), json!(1));
        let result = DispatchResult::normalized("archive", None, None, payload);

        assert_eq!(result.status, DEFAULT_STATUS);
        assert_eq!(result.message, "from payload");

        let encoded = serde_json::to_string(&result).unwrap();
        assert_eq!(encoded.matches("\"status\"").count(), 1);
        assert_eq!(encoded.matches("\"message\"").count(), 1);
        let decoded: DispatchResult = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn dispatch_result_explicit_status_beats_payload() {
        let mut payload = serde_json::Map::new();
        payload.insert("status".into(), json!("stale"));
        let result = DispatchResult::normalized("archive", Some("done".into()), None, payload);
        assert_eq!(result.status, "done");
        assert!(result.payload.is_empty());
    }
}
