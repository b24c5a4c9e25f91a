//! `Authorization` header to [`Principal`].

use crate::auth::tokens::{TokenError, TokenService};
use crate::domain::principal::Principal;
use crate::domain::types::TokenScope;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Malformed header, or unknown/expired token
    #[error("invalid or missing authentication token")]
    InvalidToken,

    #[error("identity lookup failed: {0}")]
    Internal(String),
}

/// Split `Bearer <token>` into the token. Anything else is malformed.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Resolves request identity from the bearer token.
#[derive(Clone)]
pub struct IdentityResolver {
    tokens: TokenService,
}

impl IdentityResolver {
    pub fn new(tokens: TokenService) -> Self {
        Self { tokens }
    }

    /// No header is anonymous; a present header must carry a live
    /// authentication token.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, IdentityError> {
        let Some(header) = header else {
            return Ok(Principal::Anonymous);
        };
        let token = parse_bearer(header).ok_or(IdentityError::InvalidToken)?;

        match self.tokens.verify(TokenScope::Authentication, token).await {
            Ok(user) => Ok(Principal::Authenticated(user)),
            Err(TokenError::NotFound) => Err(IdentityError::InvalidToken),
            Err(e) => Err(IdentityError::Internal(e.to_string())),
        }
    }
}
