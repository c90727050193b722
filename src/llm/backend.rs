//! Backend Selection
//!
//! Enum for selecting the LLM backend behind the resolver.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use super::{LlmResolver, MockResolver, OpenAiResolver};
use crate::config::LlmConfig;

/// LLM backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    /// OpenAI-compatible chat completions (default)
    #[default]
    OpenAi,
    /// Deterministic in-process resolver, no network
    Mock,
}

impl LlmBackend {
    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "OpenAI",
            LlmBackend::Mock => "Mock",
        }
    }
}

/// Error type for parsing LlmBackend
#[derive(Debug)]
pub struct ParseBackendError(String);

impl std::fmt::Display for ParseBackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ParseBackendError {}

impl FromStr for LlmBackend {
    type Err = ParseBackendError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(LlmBackend::OpenAi),
            "mock" | "echo" => Ok(LlmBackend::Mock),
            other => Err(ParseBackendError(format!(
                "Unknown LLM_BACKEND '{}'. Valid values: openai, gpt, mock, echo",
                other
            ))),
        }
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Build the resolver selected by the configuration.
pub fn create_resolver(config: &LlmConfig) -> Result<Arc<dyn LlmResolver>> {
    let resolver: Arc<dyn LlmResolver> = match config.backend {
        LlmBackend::OpenAi => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set when LLM_BACKEND=openai"))?;
            Arc::new(
                OpenAiResolver::with_model(api_key, &config.model)
                    .with_base_url(&config.base_url),
            )
        }
        LlmBackend::Mock => Arc::new(MockResolver::new()),
    };
    tracing::info!(
        provider = resolver.provider_name(),
        model = resolver.model_name(),
        "LLM resolver ready"
    );
    Ok(resolver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!("openai".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!("GPT".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!("mock".parse::<LlmBackend>().unwrap(), LlmBackend::Mock);
        assert_eq!("echo".parse::<LlmBackend>().unwrap(), LlmBackend::Mock);
        assert!("claude".parse::<LlmBackend>().is_err());
    }

    #[test]
    fn test_default() {
        assert_eq!(LlmBackend::default(), LlmBackend::OpenAi);
    }

    #[test]
    fn openai_backend_requires_key() {
        let config = LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: None,
            model: "gpt-4o".into(),
            base_url: "https://api.openai.com/v1".into(),
        };
        let err = create_resolver(&config).err().unwrap();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn mock_backend_needs_no_key() {
        let config = LlmConfig {
            backend: LlmBackend::Mock,
            api_key: None,
            model: "ignored".into(),
            base_url: "ignored".into(),
        };
        let resolver = create_resolver(&config).unwrap();
        assert_eq!(resolver.provider_name(), "Mock");
    }
}
