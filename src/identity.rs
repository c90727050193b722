//! Authenticated caller identity.
//!
//! Established upstream by the identity provider (the JWT middleware in
//! [`crate::api::auth`] for HTTP callers). The gateway core only compares
//! `id` against user ids embedded in payloads; it never reads raw tokens.

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub roles: Vec<String>,
}

impl Identity {
    /// Construct from validated token claims at the server boundary.
    pub fn from_claims(claims: &TokenClaims) -> Option<Self> {
        let id = claims.sub.clone().filter(|s| !s.is_empty())?;
        Some(Self {
            id,
            roles: claims.roles.clone().unwrap_or_default(),
        })
    }

    /// Construct explicitly for in-process callers and tests.
    pub fn in_process(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
        }
    }
}

/// Claims shape expected from the identity provider's bearer tokens.
#[derive(Debug, Deserialize)]
pub struct TokenClaims {
    pub sub: Option<String>,
    pub roles: Option<Vec<String>>,
    pub exp: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_claims_requires_subject() {
        let claims = TokenClaims {
            sub: None,
            roles: Some(vec!["admin".into()]),
            exp: None,
        };
        assert!(Identity::from_claims(&claims).is_none());

        let claims = TokenClaims {
            sub: Some(String::new()),
            roles: None,
            exp: None,
        };
        assert!(Identity::from_claims(&claims).is_none());
    }

    #[test]
    fn from_claims_carries_roles() {
        let claims = TokenClaims {
            sub: Some("user-7".into()),
            roles: Some(vec!["operator".into()]),
            exp: None,
        };
        let identity = Identity::from_claims(&claims).unwrap();
        assert_eq!(identity.id, "user-7");
        assert_eq!(identity.roles, vec!["operator".to_string()]);
    }
}
