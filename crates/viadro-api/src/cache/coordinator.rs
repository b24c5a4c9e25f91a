//! Response cache in front of the document listings.
//!
//! Keys are digests of the full read scope (filter, viewer, query) prefixed by
//! an in-process epoch. `invalidate_all` bumps the epoch before flushing, so
//! entries written under an older epoch are unreachable even if the flush
//! fails or a slow request writes its result after the mutation.
//!
//! Every store failure is logged and then treated as a miss.

use crate::domain::filters::ListingQuery;
use crate::domain::policy::{ListFilter, OwnerFilter};
use crate::domain::principal::Principal;
use crate::domain::types::{UserId, Visibility};
use crate::ports::CacheStore;
use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Who is looking. Document views mask fields per viewer, so the viewer is
/// part of every key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(UserId),
    Admin(UserId),
}

impl Viewer {
    pub fn of(principal: &Principal) -> Self {
        match principal.user() {
            None => Viewer::Anonymous,
            Some(u) if u.is_admin => Viewer::Admin(u.id),
            Some(u) => Viewer::User(u.id),
        }
    }
}

/// Effective read scope of a listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadScope {
    pub filter: ListFilter,
    pub viewer: Viewer,
}

/// Key of a cached listing payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Epoch the key was minted under.
    pub fn epoch(&self) -> Option<u64> {
        self.0.split(':').nth(1).and_then(|e| e.parse().ok())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length-prefixed so no field value can forge a boundary.
fn push_field(out: &mut String, value: &str) {
    let _ = write!(out, "{}:{};", value.len(), value);
}

fn canonical(scope: &ReadScope, query: &ListingQuery) -> String {
    let mut out = String::with_capacity(128);
    push_field(
        &mut out,
        match scope.filter.visibility {
            None => "any",
            Some(Visibility::Public) => "public",
            Some(Visibility::Hidden) => "hidden",
        },
    );
    let owner = match scope.filter.owner {
        OwnerFilter::Any => "any".to_string(),
        OwnerFilter::Only(id) => format!("only={}", id),
        OwnerFilter::Except(id) => format!("except={}", id),
    };
    push_field(&mut out, &owner);
    let viewer = match scope.viewer {
        Viewer::Anonymous => "anonymous".to_string(),
        Viewer::User(id) => format!("user={}", id),
        Viewer::Admin(id) => format!("admin={}", id),
    };
    push_field(&mut out, &viewer);
    push_field(&mut out, &query.title);
    push_field(&mut out, &query.tags.len().to_string());
    for tag in &query.tags {
        push_field(&mut out, tag);
    }
    push_field(&mut out, &query.page.to_string());
    push_field(&mut out, &query.page_size.to_string());
    push_field(&mut out, &query.sort.as_param());
    out
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    puts: AtomicU64,
    flushes: AtomicU64,
    errors: AtomicU64,
}

/// Snapshot of cache activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub epoch: u64,
    pub hits: u64,
    pub misses: u64,
    pub puts: u64,
    pub flushes: u64,
    pub errors: u64,
}

/// Best-effort read-through cache for listing payloads.
pub struct CacheCoordinator {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    enabled: bool,
    epoch: AtomicU64,
    counters: Counters,
}

impl CacheCoordinator {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration, enabled: bool) -> Self {
        Self {
            store,
            ttl,
            enabled,
            epoch: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// `listing:{epoch}:{sha256-hex}` over the canonical scope and query.
    pub fn key_for(&self, scope: &ReadScope, query: &ListingQuery) -> CacheKey {
        let digest = Sha256::digest(canonical(scope, query).as_bytes());
        CacheKey(format!("listing:{}:{}", self.epoch(), hex::encode(digest)))
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Bytes> {
        if !self.enabled {
            return None;
        }
        match self.store.get(key.as_str()).await {
            Ok(Some(payload)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "cache hit");
                Some(payload)
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, key: &CacheKey, payload: Bytes) {
        if !self.enabled {
            return;
        }
        if key.epoch() != Some(self.epoch()) {
            // Computed before an invalidation; nobody can read it
            debug!(key = %key, "skipping write for superseded epoch");
            return;
        }
        match self.store.set(key.as_str(), payload, self.ttl).await {
            Ok(()) => {
                self.counters.puts.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %e, "cache write failed");
            }
        }
    }

    /// Make every existing entry unreachable, then flush the store.
    pub async fn invalidate_all(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        if !self.enabled {
            return;
        }
        if let Err(e) = self.store.flush_all().await {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!(epoch, error = %e, "cache flush failed, relying on epoch bump");
        } else {
            debug!(epoch, "cache flushed");
        }
    }

    /// Drop entries whose TTL has passed.
    pub async fn purge_expired(&self) {
        if !self.enabled {
            return;
        }
        match self.store.purge_expired().await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "expired cache entries dropped"),
            Err(e) => {
                self.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "cache purge failed");
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.enabled,
            epoch: self.epoch(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
        }
    }
}

/// Periodically purge expired entries from the cache store.
pub async fn cleanup_task(cache: Arc<CacheCoordinator>, interval: Duration) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        cache.purge_expired().await;
    }
}
