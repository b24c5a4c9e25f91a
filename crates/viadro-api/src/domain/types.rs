//! Core entities: users, documents and token scopes.

use crate::domain::credentials::PasswordHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub i64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered account.
///
/// The password hash never leaves the process: it is skipped on serialization.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: PasswordHash,
    pub activated: bool,
    pub is_admin: bool,
}

/// Fields required to insert a user; id and creation time are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: PasswordHash,
    pub activated: bool,
    pub is_admin: bool,
}

/// Per-document visibility flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Hidden,
}

impl Visibility {
    pub fn from_hidden(hidden: bool) -> Self {
        if hidden {
            Visibility::Hidden
        } else {
            Visibility::Public
        }
    }

    pub fn is_hidden(self) -> bool {
        matches!(self, Visibility::Hidden)
    }

    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }

    /// The opposite visibility. Applying it twice is the identity.
    pub fn toggled(self) -> Self {
        match self {
            Visibility::Public => Visibility::Hidden,
            Visibility::Hidden => Visibility::Public,
        }
    }
}

/// Metadata row for an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub owner_id: UserId,
    pub title: String,
    pub filetype: String,
    pub tags: Vec<String>,
    /// Key of the object in object storage, used for deletion.
    pub storage_key: String,
    /// Locator returned by object storage at upload time.
    pub location: String,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn is_public(&self) -> bool {
        self.visibility.is_public()
    }
}

/// Fields required to insert a document once its object has been stored.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: UserId,
    pub title: String,
    pub filetype: String,
    pub tags: Vec<String>,
    pub storage_key: String,
    pub location: String,
    pub visibility: Visibility,
}

/// Purpose class of an opaque token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenScope {
    Activation,
    Authentication,
}

impl TokenScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
            TokenScope::Authentication => "authentication",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SHA-256 digest of a token plaintext. Equality is constant-time.
#[derive(Clone, Copy, Eq)]
pub struct TokenHash(pub [u8; 32]);

impl PartialEq for TokenHash {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.ct_eq(&other.0).into()
    }
}

impl std::hash::Hash for TokenHash {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Prefix is enough to correlate log lines
        write!(f, "TokenHash({}..)", hex::encode(&self.0[..4]))
    }
}

/// Persisted form of a token: the plaintext is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub hash: TokenHash,
    pub user_id: UserId,
    pub expiry: DateTime<Utc>,
    pub scope: TokenScope,
}

/// Normalize a tag list into a sorted set of trimmed, non-empty tags.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}
