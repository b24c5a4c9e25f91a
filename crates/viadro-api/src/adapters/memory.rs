//! In-memory repositories.
//!
//! Each repository keeps its rows behind a single `RwLock`, so every port
//! operation is atomic with respect to the others on the same repository.

use crate::adapters::clock::SystemTimeSource;
use crate::domain::filters::{title_terms, ListingQuery, SortField};
use crate::domain::policy::ListFilter;
use crate::domain::types::{
    Document, DocumentId, NewDocument, NewUser, TokenHash, TokenRecord, TokenScope, User, UserId,
};
use crate::ports::{DocumentRepository, StoreError, TimeSource, TokenRepository, UserRepository};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// =============================================================================
// USERS
// =============================================================================

#[derive(Default)]
struct UserTable {
    next_id: i64,
    rows: BTreeMap<UserId, User>,
    /// Lower-cased email to id
    by_email: HashMap<String, UserId>,
}

/// Users indexed by id and by email.
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
    clock: Arc<dyn TimeSource>,
}

impl InMemoryUserRepository {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            table: RwLock::new(UserTable::default()),
            clock,
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new(Arc::new(SystemTimeSource))
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let email_key = user.email.to_lowercase();
        let mut table = self.table.write();
        if table.by_email.contains_key(&email_key) {
            return Err(StoreError::DuplicateEmail);
        }
        table.next_id += 1;
        let row = User {
            id: UserId(table.next_id),
            created_at: self.clock.now(),
            username: user.username,
            email: user.email,
            password: user.password,
            activated: user.activated,
            is_admin: user.is_admin,
        };
        table.by_email.insert(email_key, row.id);
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: UserId) -> Result<User, StoreError> {
        self.table
            .read()
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let table = self.table.read();
        table
            .by_email
            .get(&email.to_lowercase())
            .and_then(|id| table.rows.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut table = self.table.write();
        let UserTable { rows, by_email, .. } = &mut *table;
        let existing = rows.get_mut(&user.id).ok_or(StoreError::NotFound)?;

        let old_key = existing.email.to_lowercase();
        let new_key = user.email.to_lowercase();
        if old_key != new_key {
            if by_email.contains_key(&new_key) {
                return Err(StoreError::DuplicateEmail);
            }
            by_email.remove(&old_key);
            by_email.insert(new_key, user.id);
        }

        existing.username = user.username.clone();
        existing.email = user.email.clone();
        existing.password = user.password.clone();
        existing.activated = user.activated;
        existing.is_admin = user.is_admin;
        Ok(existing.clone())
    }

    async fn delete(&self, id: UserId) -> Result<(), StoreError> {
        let mut table = self.table.write();
        let row = table.rows.remove(&id).ok_or(StoreError::NotFound)?;
        table.by_email.remove(&row.email.to_lowercase());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.table.read().rows.values().cloned().collect())
    }
}

// =============================================================================
// TOKENS
// =============================================================================

/// Token records indexed by hash.
#[derive(Default)]
pub struct InMemoryTokenRepository {
    rows: RwLock<HashMap<TokenHash, TokenRecord>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn insert(&self, record: TokenRecord) -> Result<(), StoreError> {
        self.rows.write().insert(record.hash, record);
        Ok(())
    }

    async fn find(&self, hash: &TokenHash) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.rows.read().get(hash).cloned())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: UserId,
    ) -> Result<usize, StoreError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, r| !(r.scope == scope && r.user_id == user_id));
        Ok(before - rows.len())
    }

    async fn delete_user(&self, user_id: UserId) -> Result<usize, StoreError> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, r| r.user_id != user_id);
        Ok(before - rows.len())
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

#[derive(Default)]
struct DocumentTable {
    next_id: i64,
    rows: BTreeMap<DocumentId, Document>,
}

/// Document rows with title search, tag containment, sorting and paging.
pub struct InMemoryDocumentRepository {
    table: RwLock<DocumentTable>,
    clock: Arc<dyn TimeSource>,
}

impl InMemoryDocumentRepository {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            table: RwLock::new(DocumentTable::default()),
            clock,
        }
    }
}

impl Default for InMemoryDocumentRepository {
    fn default() -> Self {
        Self::new(Arc::new(SystemTimeSource))
    }
}

/// Every query word must be one of the title's words, case-insensitively.
fn title_matches(title: &str, query: &ListingQuery) -> bool {
    let words: Vec<String> = title_terms(title).collect();
    query.title_words().all(|q| words.contains(&q))
}

fn has_all_tags(document: &Document, tags: &[String]) -> bool {
    tags.iter().all(|t| document.tags.contains(t))
}

fn compare(a: &Document, b: &Document, query: &ListingQuery) -> Ordering {
    let primary = match query.sort.field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    let primary = if query.sort.descending {
        primary.reverse()
    } else {
        primary
    };
    // Ties always resolve by ascending id
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn insert(&self, document: NewDocument) -> Result<Document, StoreError> {
        let mut table = self.table.write();
        table.next_id += 1;
        let row = Document {
            id: DocumentId(table.next_id),
            owner_id: document.owner_id,
            title: document.title,
            filetype: document.filetype,
            tags: document.tags,
            storage_key: document.storage_key,
            location: document.location,
            visibility: document.visibility,
            created_at: self.clock.now(),
        };
        table.rows.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: DocumentId) -> Result<Document, StoreError> {
        self.table
            .read()
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        self.table
            .write()
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn toggle_visibility(&self, id: DocumentId) -> Result<Document, StoreError> {
        let mut table = self.table.write();
        let row = table.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        row.visibility = row.visibility.toggled();
        Ok(row.clone())
    }

    async fn list(
        &self,
        filter: &ListFilter,
        query: &ListingQuery,
    ) -> Result<(Vec<Document>, u64), StoreError> {
        let table = self.table.read();
        let mut matching: Vec<&Document> = table
            .rows
            .values()
            .filter(|d| filter.matches(d))
            .filter(|d| title_matches(&d.title, query))
            .filter(|d| has_all_tags(d, &query.tags))
            .collect();
        matching.sort_by(|a, b| compare(a, b, query));

        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .table
            .read()
            .rows
            .values()
            .filter(|d| d.owner_id == owner)
            .cloned()
            .collect())
    }
}
