//! Bearer-token authentication.
//!
//! Decodes an HS256 JWT from `Authorization: Bearer <token>`, builds an
//! [`Identity`] from its claims and stores it in the request extensions.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use super::error::ApiError;
use crate::identity::{Identity, TokenClaims};

#[derive(Clone)]
pub struct JwtConfig {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validate a raw token and return the caller it names.
    pub fn identify(&self, token: &str) -> Result<Identity, ApiError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("rejected bearer token: {}", e);
                ApiError::unauthorized("Could not validate credentials")
            })?;
        Identity::from_claims(&data.claims)
            .ok_or_else(|| ApiError::unauthorized("Token has no subject"))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Middleware: reject unauthenticated requests, attach [`Identity`] otherwise.
pub async fn jwt_auth(mut req: Request, next: Next) -> Response {
    let Some(config) = req.extensions().get::<JwtConfig>().cloned() else {
        tracing::error!("jwt_auth mounted without a JwtConfig extension");
        return ApiError::unauthorized("Not authenticated").into_response();
    };

    let Some(token) = bearer_token(req.headers()) else {
        return ApiError::unauthorized("Not authenticated").into_response();
    };

    match config.identify(token) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &[u8] = b"unit-test-secret";

    fn mint(claims: serde_json::Value, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn far_future() -> u64 {
        (chrono::Utc::now().timestamp() + 3600) as u64
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer tok"));
        assert_eq!(bearer_token(&headers), Some("tok"));
    }

    #[test]
    fn valid_token_yields_identity() {
        let config = JwtConfig::from_secret(SECRET);
        let token = mint(
            json!({"sub": "user-1", "roles": ["operator"], "exp": far_future()}),
            SECRET,
        );
        let identity = config.identify(&token).unwrap();
        assert_eq!(identity.id, "user-1");
        assert_eq!(identity.roles, vec!["operator".to_string()]);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = JwtConfig::from_secret(SECRET);
        let token = mint(json!({"sub": "user-1", "exp": far_future()}), b"other");
        let err = config.identify(&token).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = JwtConfig::from_secret(SECRET);
        let token = mint(json!({"sub": "user-1", "exp": 1_000u64}), SECRET);
        assert!(config.identify(&token).is_err());
    }

    #[test]
    fn token_without_subject_is_rejected() {
        let config = JwtConfig::from_secret(SECRET);
        let token = mint(json!({"exp": far_future()}), SECRET);
        let err = config.identify(&token).unwrap_err();
        assert_eq!(err.detail, "Token has no subject");
    }
}
