//! OpenAI Resolver
//!
//! Resolver implementation for OpenAI-compatible chat completion endpoints.

use async_trait::async_trait;
use gateway_types::{Entities, IntentResolution, Message, Mode, Role, Usage};
use serde::Deserialize;

use super::{intent_tool, Completion, CompletionRequest, LlmResolver, ResolverError};

/// Default OpenAI model
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const COMMAND_MODE_INSTRUCTION: &str = "You are a command interpreter for a business \
operations platform. Reply tersely and state the action you understood.";

const INTENT_SYSTEM_PROMPT: &str = "You route natural-language requests to platform \
modules. Call route_intent with a single snake_case intent and every entity you can \
extract. Use the intent 'unknown' when nothing fits.";

/// Provider error bodies are truncated to this many bytes in logs.
const MAX_LOGGED_BODY: usize = 1000;

/// OpenAI API resolver
#[derive(Clone)]
pub struct OpenAiResolver {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OpenAiResolver {
    /// Create a new resolver with the given API key and the default model
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, DEFAULT_MODEL)
    }

    /// Create with a specific model
    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the resolver at another OpenAI-compatible endpoint
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Request body for the completion capability
    fn completion_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut messages: Vec<serde_json::Value> = Vec::with_capacity(request.messages.len() + 1);
        if request.mode == Mode::Command {
            messages.push(serde_json::json!({
                "role": "system",
                "content": COMMAND_MODE_INSTRUCTION
            }));
        }
        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": &m.content
            })
        }));

        let mut body = serde_json::json!({
            "model": request.params.model.as_deref().unwrap_or(&self.model),
            "messages": messages,
        });
        if let Some(t) = request.params.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if let Some(max) = request.params.max_tokens {
            body["max_tokens"] = serde_json::json!(max);
        }
        body
    }

    /// Request body for intent extraction via forced function calling
    fn intent_body(&self, text: &str, session_id: &str) -> serde_json::Value {
        let tool = intent_tool();
        serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": INTENT_SYSTEM_PROMPT},
                {"role": "user", "content": text}
            ],
            "temperature": 0.1,
            "user": session_id,
            "functions": [{
                "name": &tool.name,
                "description": &tool.description,
                "parameters": &tool.parameters
            }],
            "function_call": {"name": &tool.name}
        })
    }

    /// POST a body and return the raw response text
    async fn call_api(&self, body: &serde_json::Value) -> Result<String, ResolverError> {
        let response = self
            .client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ResolverError::Backend(format!(
                "OpenAI API error {}: {}",
                status,
                truncate(&body)
            )));
        }

        let text = response.text().await?;
        tracing::debug!("OpenAI raw response: {}", truncate(&text));
        Ok(text)
    }
}

fn truncate(s: &str) -> &str {
    if s.len() <= MAX_LOGGED_BODY {
        return s;
    }
    let mut end = MAX_LOGGED_BODY;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// Parse a chat completion response into assistant messages plus usage
fn parse_completion(text: &str) -> Result<Completion, ResolverError> {
    #[derive(Deserialize)]
    struct ApiMessage {
        content: Option<String>,
    }
    #[derive(Deserialize)]
    struct Choice {
        message: ApiMessage,
    }
    #[derive(Deserialize)]
    struct ApiResponse {
        choices: Vec<Choice>,
        usage: Option<ApiUsage>,
    }

    let api_response: ApiResponse = serde_json::from_str(text)
        .map_err(|e| ResolverError::Backend(format!("Failed to parse OpenAI response: {}", e)))?;

    let messages: Vec<Message> = api_response
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .map(|content| Message::text(Role::Assistant, content))
        .collect();

    if messages.is_empty() {
        return Err(ResolverError::Backend(
            "OpenAI returned no message content".to_string(),
        ));
    }

    Ok(Completion {
        messages,
        usage: api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
            cost_units: None,
        }),
    })
}

/// Parse a function_call response into an intent resolution
fn parse_intent(text: &str) -> Result<IntentResolution, ResolverError> {
    // Response format:
    // { "choices": [{ "message": { "function_call": { "name": "...", "arguments": "..." } } }] }
    #[derive(Deserialize)]
    struct FunctionCall {
        arguments: String, // OpenAI returns arguments as a JSON string
    }
    #[derive(Deserialize)]
    struct ApiMessage {
        function_call: Option<FunctionCall>,
    }
    #[derive(Deserialize)]
    struct Choice {
        message: ApiMessage,
    }
    #[derive(Deserialize)]
    struct ApiResponse {
        choices: Vec<Choice>,
    }
    #[derive(Deserialize)]
    struct Arguments {
        intent: Option<String>,
        #[serde(default)]
        entities: Option<Entities>,
    }

    let api_response: ApiResponse = serde_json::from_str(text)
        .map_err(|e| ResolverError::Backend(format!("Failed to parse OpenAI response: {}", e)))?;

    let function_call = api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.function_call)
        .ok_or_else(|| ResolverError::Backend("No function_call in OpenAI response".to_string()))?;

    let args: Arguments = serde_json::from_str(&function_call.arguments).map_err(|e| {
        ResolverError::Backend(format!("Failed to parse function arguments: {}", e))
    })?;

    let intent = args
        .intent
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .ok_or_else(|| ResolverError::Backend("function arguments carry no intent".to_string()))?;

    Ok(IntentResolution::new(intent, args.entities.unwrap_or_default()))
}

#[async_trait]
impl LlmResolver for OpenAiResolver {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ResolverError> {
        request.validate()?;
        let body = self.completion_body(&request);
        let text = self.call_api(&body).await?;
        parse_completion(&text)
    }

    async fn extract_intent(
        &self,
        text: &str,
        session_id: &str,
    ) -> Result<IntentResolution, ResolverError> {
        let body = self.intent_body(text, session_id);
        let response = self.call_api(&body).await?;
        let resolution = parse_intent(&response)?;
        tracing::info!(
            intent = %resolution.intent,
            entity_count = resolution.entities.len(),
            "OpenAI resolved intent"
        );
        Ok(resolution)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationParams;
    use serde_json::json;

    #[test]
    fn test_new_client() {
        let client = OpenAiResolver::new("test-key".to_string());
        assert_eq!(client.model_name(), DEFAULT_MODEL);
        assert_eq!(client.provider_name(), "OpenAI");
        assert_eq!(
            client.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let client = OpenAiResolver::with_model("k".into(), "local-model")
            .with_base_url("http://localhost:8080/v1/");
        assert_eq!(client.model_name(), "local-model");
        assert_eq!(
            client.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn completion_body_applies_overrides() {
        let client = OpenAiResolver::new("k".into());
        let request = CompletionRequest::new(vec![Message::user("hi")], Mode::Chat).with_params(
            GenerationParams {
                model: Some("gpt-4o-mini".into()),
                temperature: Some(0.5),
                max_tokens: Some(64),
            },
        );
        let body = client.completion_body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["temperature"], json!(0.5));
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn completion_body_command_mode_prepends_instruction() {
        let client = OpenAiResolver::new("k".into());
        let request = CompletionRequest::new(vec![Message::user("ship order 7")], Mode::Command);
        let body = client.completion_body(&request);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "ship order 7");
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn intent_body_forces_function_call() {
        let client = OpenAiResolver::new("k".into());
        let body = client.intent_body("order 3 apples", "session-9");
        assert_eq!(body["function_call"]["name"], "route_intent");
        assert_eq!(body["user"], "session-9");
        assert_eq!(body["messages"][1]["content"], "order 3 apples");
    }

    #[test]
    fn parse_completion_collects_messages_and_usage() {
        let text = json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello!"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        })
        .to_string();
        let completion = parse_completion(&text).unwrap();
        assert_eq!(completion.messages, vec![Message::assistant("Hello!")]);
        assert_eq!(completion.usage.unwrap().total_tokens, 7);
    }

    #[test]
    fn parse_completion_rejects_empty_choices() {
        let text = json!({"choices": []}).to_string();
        assert!(matches!(
            parse_completion(&text),
            Err(ResolverError::Backend(_))
        ));
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(ResolverError::Backend(_))
        ));
    }

    #[test]
    fn parse_intent_reads_function_arguments() {
        let arguments =
            json!({"intent": "create_order", "entities": {"product": "apple", "quantity": 3}});
        let text = json!({
            "choices": [{"message": {"function_call": {
                "name": "route_intent",
                "arguments": arguments.to_string()
            }}}]
        })
        .to_string();
        let resolution = parse_intent(&text).unwrap();
        assert_eq!(resolution.intent, "create_order");
        assert_eq!(resolution.entities["quantity"], json!(3));
    }

    #[test]
    fn parse_intent_rejects_missing_intent() {
        let text = json!({
            "choices": [{"message": {"function_call": {
                "name": "route_intent",
                "arguments": "{\"entities\": {}}"
            }}}]
        })
        .to_string();
        assert!(matches!(parse_intent(&text), Err(ResolverError::Backend(_))));

        let no_call = json!({"choices": [{"message": {"content": "hi"}}]}).to_string();
        assert!(matches!(
            parse_intent(&no_call),
            Err(ResolverError::Backend(_))
        ));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let long = "é".repeat(MAX_LOGGED_BODY);
        let cut = truncate(&long);
        assert!(cut.len() <= MAX_LOGGED_BODY);
        assert!(long.starts_with(cut));
    }
}
