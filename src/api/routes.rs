//! Route handlers. Each one builds the [`RequestContext`] for its call and
//! hands the typed payload to the gateway core.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use gateway_types::{LegacyRequest, RequestPayload};
use serde_json::json;

use super::error::{attach_request_id, ApiError, REQUEST_ID_HEADER};
use crate::context::RequestContext;
use crate::gateway::Gateway;
use crate::health::HealthAggregator;
use crate::identity::Identity;

pub const WELCOME_MESSAGE: &str = "Welcome to the Semantic Gateway API v1";

/// GET /api/v1/
pub async fn api_root() -> Json<serde_json::Value> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

fn body_or_reject<T>(
    body: Result<Json<T>, JsonRejection>,
    ctx: &RequestContext,
) -> Result<T, ApiError> {
    body.map(|Json(payload)| payload).map_err(|rejection| {
        tracing::debug!(request_id = %ctx.request_id(), "rejected body: {}", rejection);
        ApiError {
            status: rejection.status(),
            detail: rejection.body_text(),
            request_id: Some(ctx.request_id()),
        }
    })
}

/// POST /api/v1/gateway/process_request
pub async fn process_request(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<RequestPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::new();
    let payload = body_or_reject(body, &ctx)?;
    let response = gateway
        .process_request(&ctx, payload, &identity)
        .await
        .map_err(|e| ApiError::from_gateway(&e, &ctx))?;

    let mut response = Json(response).into_response();
    attach_request_id(&mut response, &ctx.request_id().to_string());
    Ok(response)
}

/// POST /api/v1/gateway/legacy/process_request
pub async fn legacy_process_request(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<LegacyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let ctx = RequestContext::new();
    let request = body_or_reject(body, &ctx)?;
    let output = gateway
        .legacy_process_request(&ctx, request, &identity)
        .await
        .map_err(|e| ApiError::from_gateway(&e, &ctx))?;

    let mut response = Json(output).into_response();
    attach_request_id(&mut response, &ctx.request_id().to_string());
    Ok(response)
}

/// GET /api/v1/status
///
/// 200 with the report when healthy, 503 with the same body otherwise. An
/// incoming `x-request-id` is reused as the trace id.
pub async fn get_status(
    Extension(health): Extension<Arc<HealthAggregator>>,
    headers: HeaderMap,
) -> Response {
    let trace_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let report = health.check(trace_id).await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        tracing::warn!(trace_id = %report.trace_id, "{}", report.message);
        StatusCode::SERVICE_UNAVAILABLE
    };

    let trace_id = report.trace_id.clone();
    let mut response = (status, Json(report)).into_response();
    attach_request_id(&mut response, &trace_id);
    response
}
