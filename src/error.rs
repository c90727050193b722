//! Error taxonomy for the gateway flows
//!
//! Client-class errors are rejected with a full description. Everything else
//! collapses to an opaque internal error at the boundary: the cause is logged
//! server-side with the correlation id and never echoed to the caller.

use gateway_types::TypesError;
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::llm::ResolverError;

/// Text returned to callers for every internal-class failure.
pub const INTERNAL_ERROR_DETAIL: &str = "An error occurred while processing the request";

/// Main error type for the gateway flows
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("User ID in payload does not match authenticated user")]
    AuthorizationMismatch { payload_user: String, identity: String },

    #[error("{0}")]
    MalformedRequest(String),

    #[error("{0}")]
    InvalidParameters(String),

    #[error("Intent '{intent}' is not routable")]
    UnroutableIntent { intent: String },

    #[error("Intent '{intent}' was rejected: {reason}")]
    HandlerRejected { intent: String, reason: String },

    #[error("handler for intent '{intent}' failed")]
    HandlerFailure {
        intent: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("internal failure")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::AuthorizationMismatch { .. } => 403,
            Self::MalformedRequest(_) => 400,
            Self::InvalidParameters(_) => 400,
            Self::UnroutableIntent { .. } => 400,
            Self::HandlerRejected { .. } => 422,
            Self::HandlerFailure { .. } => 500,
            Self::BackendUnavailable(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Whether the caller is at fault and may see the full description.
    pub fn is_client_error(&self) -> bool {
        self.http_status() < 500
    }

    /// Detail safe to send across the boundary.
    pub fn public_detail(&self) -> String {
        if self.is_client_error() {
            self.to_string()
        } else {
            INTERNAL_ERROR_DETAIL.to_string()
        }
    }
}

impl From<TypesError> for GatewayError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::MissingMessages => Self::MalformedRequest(err.to_string()),
        }
    }
}

impl From<ResolverError> for GatewayError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::InvalidParameters(msg) => Self::InvalidParameters(msg),
            ResolverError::Backend(msg) => Self::BackendUnavailable(msg),
        }
    }
}

impl From<DispatchError> for GatewayError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Unroutable { intent } => Self::UnroutableIntent { intent },
            DispatchError::Rejected { intent, reason } => Self::HandlerRejected { intent, reason },
            DispatchError::Failed { intent, source } => Self::HandlerFailure { intent, source },
        }
    }
}
