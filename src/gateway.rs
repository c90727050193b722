//! Gateway Orchestrator
//!
//! Composes payload validation, the LLM resolver and the intent dispatcher into
//! the two request flows:
//!
//! - [`Gateway::process_request`]: messages in, resolver completion out.
//! - [`Gateway::legacy_process_request`]: free text in, resolved intent
//!   dispatched to its handler, normalized result out.
//!
//! Steps within a flow are strictly sequential. Every flow runs inside a
//! `tracing` span carrying the correlation id and under a request deadline;
//! dropping the returned future abandons any in-flight external call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gateway_types::{LegacyRequest, ProcessRequestOutput, RequestPayload, ResponsePayload};
use tracing::Instrument;

use crate::context::RequestContext;
use crate::dispatch::IntentDispatcher;
use crate::error::GatewayError;
use crate::identity::Identity;
use crate::llm::{CompletionRequest, GenerationParams, LlmResolver};

/// Deadline applied when none is configured
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Gateway {
    resolver: Arc<dyn LlmResolver>,
    dispatcher: IntentDispatcher,
    request_timeout: Duration,
}

impl Gateway {
    pub fn new(resolver: Arc<dyn LlmResolver>, dispatcher: IntentDispatcher) -> Self {
        Self {
            resolver,
            dispatcher,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Messages-based flow.
    ///
    /// Rejects before calling the resolver when the payload's user id differs
    /// from the caller's identity or when neither `messages` nor `input` is usable.
    pub async fn process_request(
        &self,
        ctx: &RequestContext,
        payload: RequestPayload,
        identity: &Identity,
    ) -> Result<ResponsePayload, GatewayError> {
        let span = tracing::info_span!(
            "process_request",
            request_id = %ctx.request_id(),
            user_id = %identity.id,
            session_id = %payload.metadata.session_id,
        );
        async move {
            tracing::info!(
                "Processing request: mode={}, model={}",
                payload.metadata.mode,
                payload.model.as_deref().unwrap_or("default")
            );
            let result = self
                .with_deadline(self.run_process_request(payload, identity))
                .await;
            match &result {
                Ok(response) => tracing::info!(
                    elapsed_ms = ctx.elapsed_ms() as u64,
                    "Request processed successfully: {} messages returned",
                    response.messages.len()
                ),
                Err(err) => log_failure(err),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_process_request(
        &self,
        payload: RequestPayload,
        identity: &Identity,
    ) -> Result<ResponsePayload, GatewayError> {
        authorize(&payload.metadata.user_id, identity)?;

        let messages = payload.effective_messages()?;
        let request = CompletionRequest::new(messages, payload.metadata.mode).with_params(
            GenerationParams {
                model: payload.model,
                temperature: payload.temperature,
                max_tokens: payload.max_tokens,
            },
        );

        let completion = self.resolver.complete(request).await?;

        // Stamped at response construction, never at receipt.
        let metadata = payload.metadata.stamped(Utc::now());

        Ok(ResponsePayload {
            messages: completion.messages,
            metadata,
            usage: completion.usage,
        })
    }

    /// Text-based legacy flow: resolve an intent, dispatch it, normalize the result.
    pub async fn legacy_process_request(
        &self,
        ctx: &RequestContext,
        request: LegacyRequest,
        identity: &Identity,
    ) -> Result<ProcessRequestOutput, GatewayError> {
        let span = tracing::info_span!(
            "legacy_process_request",
            request_id = %ctx.request_id(),
            user_id = %identity.id,
            session_id = %request.session_id,
        );
        async move {
            tracing::info!("Received legacy process_request: '{}'", request.text);
            let result = self
                .with_deadline(self.run_legacy(ctx, request, identity))
                .await;
            if let Err(err) = &result {
                log_failure(err);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_legacy(
        &self,
        ctx: &RequestContext,
        request: LegacyRequest,
        identity: &Identity,
    ) -> Result<ProcessRequestOutput, GatewayError> {
        authorize(&request.user_id, identity)?;

        let resolution = self
            .resolver
            .extract_intent(&request.text, &request.session_id)
            .await?;
        tracing::info!(
            "LLM Result: Intent='{}', Entities={:?}",
            resolution.intent,
            resolution.entities
        );

        let result = self
            .dispatcher
            .dispatch(&resolution.intent, &resolution.entities, &identity.id)
            .await?;
        tracing::info!(
            elapsed_ms = ctx.elapsed_ms() as u64,
            "Dispatch successful for intent '{}'. Status: {}",
            resolution.intent,
            result.status
        );

        Ok(ProcessRequestOutput {
            status: result.status.clone(),
            message: result.message.clone(),
            intent: resolution.intent,
            data: result,
            request_id: ctx.request_id().to_string(),
        })
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::BackendUnavailable(format!(
                "request deadline of {}ms elapsed",
                self.request_timeout.as_millis()
            ))),
        }
    }
}

/// The payload's user id must be the authenticated caller's.
fn authorize(payload_user: &str, identity: &Identity) -> Result<(), GatewayError> {
    if payload_user != identity.id {
        return Err(GatewayError::AuthorizationMismatch {
            payload_user: payload_user.to_string(),
            identity: identity.id.clone(),
        });
    }
    Ok(())
}

fn log_failure(err: &GatewayError) {
    match err {
        GatewayError::AuthorizationMismatch {
            payload_user,
            identity,
        } => tracing::warn!(
            "User ID mismatch: payload={}, token={}",
            payload_user,
            identity
        ),
        GatewayError::MalformedRequest(detail) => {
            tracing::error!("Malformed request: {}", detail)
        }
        err if err.is_client_error() => tracing::warn!("Request rejected: {}", err),
        err => tracing::error!(
            status = err.http_status(),
            "Error processing request: {}",
            error_chain(err)
        ),
    }
}

/// Render an error with every `source()` below it.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
