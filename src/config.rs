//! Gateway configuration.
//!
//! Reads config from env vars (a `.env` file is honoured by the binary):
//!   GATEWAY_BIND_ADDR          - listen address (default: 0.0.0.0:8000)
//!   GATEWAY_JWT_SECRET         - JWT HMAC secret (required)
//!   DATABASE_URL               - Postgres connection string (required)
//!   REDIS_URL                  - cache/broker (default: redis://127.0.0.1:6379)
//!   LLM_BACKEND                - openai | mock (default: openai)
//!   OPENAI_API_KEY             - required for the openai backend
//!   OPENAI_MODEL               - default model (default: gpt-4o)
//!   OPENAI_BASE_URL            - OpenAI-compatible endpoint
//!   GATEWAY_REQUEST_TIMEOUT_MS - deadline per gateway flow (default: 30000)
//!   GATEWAY_PROBE_TIMEOUT_MS   - deadline per health probe (default: 2000)
//!   GATEWAY_CORS_ALLOW_ANY     - permissive CORS (default: false)

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::llm::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::llm::LlmBackend;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub database_url: String,
    pub redis_url: String,
    pub llm: LlmConfig,
    pub request_timeout: Duration,
    pub probe_timeout: Duration,
    pub cors_allow_any: bool,
}

impl GatewayConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{} must be set", key));

        let backend = match get("LLM_BACKEND") {
            Some(value) => value
                .parse::<LlmBackend>()
                .map_err(|e| anyhow!("{}", e))?,
            None => LlmBackend::default(),
        };

        Ok(Self {
            bind_addr: get("GATEWAY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            jwt_secret: required("GATEWAY_JWT_SECRET")?,
            database_url: required("DATABASE_URL")?,
            redis_url: get("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.into()),
            llm: LlmConfig {
                backend,
                api_key: get("OPENAI_API_KEY"),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
                base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            },
            request_timeout: millis(
                get("GATEWAY_REQUEST_TIMEOUT_MS"),
                "GATEWAY_REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )?,
            probe_timeout: millis(
                get("GATEWAY_PROBE_TIMEOUT_MS"),
                "GATEWAY_PROBE_TIMEOUT_MS",
                DEFAULT_PROBE_TIMEOUT_MS,
            )?,
            cors_allow_any: flag(get("GATEWAY_CORS_ALLOW_ANY"), "GATEWAY_CORS_ALLOW_ANY")?,
        })
    }
}

fn millis(value: Option<String>, key: &str, default: u64) -> Result<Duration> {
    let ms = match value {
        Some(v) => v.trim().parse::<u64>().with_context(|| {
            format!("{} must be a whole number of milliseconds, got '{}'", key, v)
        })?,
        None => default,
    };
    if ms == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_millis(ms))
}

fn flag(value: Option<String>, key: &str) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("{} must be a boolean, got '{}'", key, v)),
        },
    }
}
