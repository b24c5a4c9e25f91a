//! Opaque scoped tokens.
//!
//! A token is 16 bytes from the OS CSPRNG rendered as unpadded base-32
//! (26 characters). Only its SHA-256 digest is persisted, so a leaked token
//! table yields nothing presentable.

use crate::domain::types::{TokenHash, TokenRecord, TokenScope, User, UserId};
use crate::ports::{StoreError, TimeSource, TokenRepository, UserRepository};
use chrono::{DateTime, Utc};
use data_encoding::BASE32_NOPAD;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Random bytes per token.
pub const TOKEN_BYTES: usize = 16;

/// Length of the base-32 plaintext.
pub const TOKEN_LENGTH: usize = 26;

/// A freshly minted token. The plaintext exists only in this value.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: TokenHash,
    #[serde(skip)]
    pub user_id: UserId,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: TokenScope,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Unknown, expired, revoked or wrong scope. Deliberately indistinguishable.
    #[error("token not found")]
    NotFound,

    #[error("random number generator failure: {0}")]
    Rng(String),

    #[error("token ttl out of range")]
    InvalidTtl,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for TokenError {
    fn from(e: StoreError) -> Self {
        match e {
            // The user behind a token vanished: the token is dead too
            StoreError::NotFound => TokenError::NotFound,
            other => TokenError::Store(other),
        }
    }
}

/// SHA-256 of the plaintext.
pub fn hash_token(plaintext: &str) -> TokenHash {
    TokenHash(Sha256::digest(plaintext.as_bytes()).into())
}

/// Cheap shape check run before any hashing or lookup.
pub fn is_well_formed(plaintext: &str) -> bool {
    plaintext.len() == TOKEN_LENGTH && BASE32_NOPAD.decode(plaintext.as_bytes()).is_ok()
}

/// Mints, verifies and revokes tokens.
#[derive(Clone)]
pub struct TokenService {
    tokens: Arc<dyn TokenRepository>,
    users: Arc<dyn UserRepository>,
    clock: Arc<dyn TimeSource>,
}

impl TokenService {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            tokens,
            users,
            clock,
        }
    }

    /// Mint and persist a token for `user_id`, valid for `ttl`.
    pub async fn mint(
        &self,
        user_id: UserId,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<Token, TokenError> {
        let mut random = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut random)
            .map_err(|e| TokenError::Rng(e.to_string()))?;
        let plaintext = BASE32_NOPAD.encode(&random);
        let hash = hash_token(&plaintext);

        let ttl = chrono::Duration::from_std(ttl).map_err(|_| TokenError::InvalidTtl)?;
        let expiry = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or(TokenError::InvalidTtl)?;

        self.tokens
            .insert(TokenRecord {
                hash,
                user_id,
                expiry,
                scope,
            })
            .await?;

        debug!(user_id = %user_id, scope = %scope, hash = ?hash, "token minted");
        Ok(Token {
            plaintext,
            hash,
            user_id,
            expiry,
            scope,
        })
    }

    /// Resolve a presented plaintext to its user, loaded fresh.
    pub async fn verify(&self, scope: TokenScope, presented: &str) -> Result<User, TokenError> {
        if !is_well_formed(presented) {
            return Err(TokenError::NotFound);
        }
        let hash = hash_token(presented);
        let record = self
            .tokens
            .find(&hash)
            .await?
            .ok_or(TokenError::NotFound)?;

        if record.scope != scope || record.expiry <= self.clock.now() {
            return Err(TokenError::NotFound);
        }

        Ok(self.users.get(record.user_id).await?)
    }

    /// Delete every token of `scope` for `user_id`.
    pub async fn revoke_all(&self, scope: TokenScope, user_id: UserId) -> Result<usize, TokenError> {
        let removed = self.tokens.delete_all_for_user(scope, user_id).await?;
        debug!(user_id = %user_id, scope = %scope, removed, "tokens revoked");
        Ok(removed)
    }

    /// Delete every token of `user_id` in any scope.
    pub async fn revoke_user(&self, user_id: UserId) -> Result<usize, TokenError> {
        Ok(self.tokens.delete_user(user_id).await?)
    }
}
