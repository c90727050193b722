//! HTTP error bodies.
//!
//! Every error leaves the server as `{"detail": ..., "request_id": ...}`.
//! Internal-class details are replaced by a generic message before they get here.

use axum::{
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::GatewayError;

/// Header carrying the correlation id on responses
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
    pub request_id: Option<Uuid>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            request_id: None,
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    /// Translate a gateway failure, keeping only the caller-safe detail.
    pub fn from_gateway(err: &GatewayError, ctx: &RequestContext) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self {
            status,
            detail: err.public_detail(),
            request_id: Some(ctx.request_id()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: &self.detail,
            request_id: self.request_id.map(|id| id.to_string()),
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(id) = self.request_id {
            attach_request_id(&mut response, &id.to_string());
        }
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Set `x-request-id` on a response. Values that are not valid header text are skipped.
pub fn attach_request_id(response: &mut Response, request_id: &str) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_errors_carry_generic_detail() {
        let ctx = RequestContext::new();
        let err = GatewayError::Internal(anyhow::anyhow!("password=hunter2"));
        let api = ApiError::from_gateway(&err, &ctx);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!api.detail.contains("hunter2"));
        assert_eq!(api.request_id, Some(ctx.request_id()));
    }

    #[test]
    fn response_has_request_id_header() {
        let ctx = RequestContext::new();
        let err = GatewayError::MalformedRequest("bad".into());
        let response = ApiError::from_gateway(&err, &ctx).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[REQUEST_ID_HEADER],
            ctx.request_id().to_string().as_str()
        );
    }

    #[test]
    fn unauthorized_sets_www_authenticate() {
        let response = ApiError::unauthorized("Not authenticated").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
