//! Authentication
//!
//! Credentials are verified by an injected [`IdentityProvider`]; handlers
//! only ever see the resulting subject id.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use boxshelf_core::UserId;

use crate::http::ApiError;
use crate::AppState;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("unknown or expired token")]
    InvalidToken,
}

/// Verifies a bearer token and returns the subject it belongs to.
pub trait IdentityProvider: Send + Sync {
    fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}

/// Fixed token table, loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenIdentity {
    pub fn new(tokens: HashMap<String, UserId>) -> Self {
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<UserId>) -> Self {
        self.tokens.insert(token.into(), subject.into());
        self
    }
}

impl IdentityProvider for StaticTokenIdentity {
    fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

/// The verified caller, stored as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Bearer token authentication middleware
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or(AuthError::MissingToken)?;
    let subject = state.identity.verify(token)?;
    tracing::debug!(user = %subject, "request authenticated");

    request.extensions_mut().insert(AuthenticatedUser(subject));
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_tokens() {
        let identity = StaticTokenIdentity::default().with_token("t-1", "u1");
        assert_eq!(identity.verify("t-1").unwrap(), "u1");
        assert!(matches!(
            identity.verify("t-2"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let req = Request::builder()
            .header("Authorization", "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), Some("abc"));

        let req = Request::builder()
            .header("Authorization", "Basic abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), None);

        let req = Request::builder()
            .header("Authorization", "Bearer ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), None);
    }
}
