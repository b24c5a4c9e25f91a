//! # Outbound Ports (Driven Ports)
//!
//! Dependencies required by the document API. In-process implementations live
//! in `crate::adapters`.

use crate::domain::filters::ListingQuery;
use crate::domain::policy::ListFilter;
use crate::domain::types::{
    Document, DocumentId, NewDocument, NewUser, TokenHash, TokenRecord, TokenScope, User, UserId,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Relational store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Object storage failures.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("object storage failure: {0}")]
    Backend(String),
}

/// Cache store failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Mail relay failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    #[error("mail relay rejected message: {0}")]
    Rejected(String),

    #[error("mail relay unavailable: {0}")]
    Unavailable(String),
}

/// User accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Emails are unique (case-insensitive).
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get(&self, id: UserId) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Overwrite the mutable fields of an existing user.
    async fn update(&self, user: &User) -> Result<User, StoreError>;

    async fn delete(&self, id: UserId) -> Result<(), StoreError>;

    /// All users ordered by id.
    async fn list(&self) -> Result<Vec<User>, StoreError>;
}

/// Hashed, scoped tokens.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert(&self, record: TokenRecord) -> Result<(), StoreError>;

    /// Look a token up by hash. Expiry is NOT checked here.
    async fn find(&self, hash: &TokenHash) -> Result<Option<TokenRecord>, StoreError>;

    /// Delete every token of `scope` belonging to `user_id`; returns the count removed.
    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: UserId,
    ) -> Result<usize, StoreError>;

    /// Delete every token of `user_id` regardless of scope.
    async fn delete_user(&self, user_id: UserId) -> Result<usize, StoreError>;
}

/// Document metadata rows.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: NewDocument) -> Result<Document, StoreError>;

    async fn get(&self, id: DocumentId) -> Result<Document, StoreError>;

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError>;

    /// Flip visibility atomically and return the updated row.
    async fn toggle_visibility(&self, id: DocumentId) -> Result<Document, StoreError>;

    /// One page of rows matching `filter` and `query`, plus the total match count.
    async fn list(
        &self,
        filter: &ListFilter,
        query: &ListingQuery,
    ) -> Result<(Vec<Document>, u64), StoreError>;

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Document>, StoreError>;
}

/// Blob storage for uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key`; returns the public locator of the object.
    async fn put(&self, key: &str, content_type: &str, body: Bytes)
        -> Result<String, ObjectStoreError>;

    /// Remove the object. Removing a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}

/// Key-value cache with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Drop every entry.
    async fn flush_all(&self) -> Result<(), CacheError>;

    /// Drop expired entries, returning how many went. Stores that expire
    /// entries on their own keep the default.
    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Ok(0)
    }
}

/// A rendered email ready for the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub plain_body: String,
    pub html_body: String,
}

/// Outgoing mail relay.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Time source trait for testability
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
