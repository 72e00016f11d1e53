//! Bearer-token authorization for administrative actions
//!
//! Token issuance lives outside this service. The router only needs to know
//! whether a presented token is valid and whether it carries the admin role,
//! which is what [`AdminAuthorizer`] answers.

use crate::api::error::ApiError;
use crate::config::AuthConfig;
use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Role name that grants administrative actions
pub const ADMIN_ROLE: &str = "admin";

/// Outcome of checking a bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCheck {
    /// Valid token with the admin role
    Admin,
    /// Valid token without the admin role
    NotAdmin,
    /// Unknown token
    Invalid,
}

/// Answers whether a bearer token belongs to an authorized admin
pub trait AdminAuthorizer: Send + Sync {
    fn check(&self, token: &str) -> AdminCheck;
}

/// Authorizer backed by the tokens listed in the configuration
///
/// Tokens are held as SHA-256 digests rather than plaintext.
#[derive(Debug, Default)]
pub struct StaticTokenAuthorizer {
    roles_by_digest: HashMap<String, String>,
}

impl StaticTokenAuthorizer {
    pub fn from_config(config: &AuthConfig) -> Self {
        let roles_by_digest = config
            .tokens
            .iter()
            .map(|entry| (digest(&entry.token), entry.role.clone()))
            .collect();

        Self { roles_by_digest }
    }
}

impl AdminAuthorizer for StaticTokenAuthorizer {
    fn check(&self, token: &str) -> AdminCheck {
        match self.roles_by_digest.get(&digest(token)) {
            Some(role) if role == ADMIN_ROLE => AdminCheck::Admin,
            Some(_) => AdminCheck::NotAdmin,
            None => AdminCheck::Invalid,
        }
    }
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Rejects the request unless it carries an admin bearer token
///
/// Missing or unknown tokens are 401; valid non-admin tokens are 403.
pub fn require_admin(authorizer: &dyn AdminAuthorizer, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    match authorizer.check(token) {
        AdminCheck::Admin => Ok(()),
        AdminCheck::NotAdmin => Err(ApiError::Forbidden(
            "Not enough permissions".to_string(),
        )),
        AdminCheck::Invalid => Err(ApiError::Unauthorized(
            "Could not validate credentials".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenEntry;
    use axum::http::HeaderValue;

    fn authorizer() -> StaticTokenAuthorizer {
        StaticTokenAuthorizer::from_config(&AuthConfig {
            tokens: vec![
                TokenEntry {
                    token: "admin-secret".to_string(),
                    role: "admin".to_string(),
                },
                TokenEntry {
                    token: "reader-secret".to_string(),
                    role: "reader".to_string(),
                },
            ],
        })
    }

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_check_roles() {
        let auth = authorizer();
        assert_eq!(auth.check("admin-secret"), AdminCheck::Admin);
        assert_eq!(auth.check("reader-secret"), AdminCheck::NotAdmin);
        assert_eq!(auth.check("guess"), AdminCheck::Invalid);
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic abc")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_require_admin() {
        let auth = authorizer();
        assert!(require_admin(&auth, &headers("Bearer admin-secret")).is_ok());
        assert!(matches!(
            require_admin(&auth, &headers("Bearer reader-secret")),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            require_admin(&auth, &headers("Bearer nope")),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            require_admin(&auth, &HeaderMap::new()),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_no_tokens_configured() {
        let auth = StaticTokenAuthorizer::default();
        assert_eq!(auth.check("anything"), AdminCheck::Invalid);
    }
}
