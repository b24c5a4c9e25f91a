//! HTTP handlers and the state they share.

pub mod admin;
pub mod documents;
pub mod extract;
pub mod health;
pub mod users;

use crate::auth::TokenService;
use crate::background::BackgroundTasks;
use crate::cache::CacheCoordinator;
use crate::domain::config::ServerConfig;
use crate::domain::ApiError;
use crate::ports::{
    CacheStore, DocumentRepository, Mailer, ObjectStore, TimeSource, TokenRepository,
    UserRepository,
};
use std::sync::Arc;
use std::time::Instant;

/// Outbound dependencies of the server.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub objects: Arc<dyn ObjectStore>,
    pub cache_store: Arc<dyn CacheStore>,
    pub mailer: Arc<dyn Mailer>,
    pub clock: Arc<dyn TimeSource>,
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub users: Arc<dyn UserRepository>,
    pub documents: Arc<dyn DocumentRepository>,
    pub objects: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
    pub tokens: TokenService,
    pub cache: Arc<CacheCoordinator>,
    pub background: BackgroundTasks,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, deps: Collaborators) -> Self {
        let tokens = TokenService::new(deps.tokens, Arc::clone(&deps.users), deps.clock);
        let cache = Arc::new(CacheCoordinator::new(
            deps.cache_store,
            config.cache.ttl,
            config.cache.enabled,
        ));
        Self {
            config: Arc::new(config),
            users: deps.users,
            documents: deps.documents,
            objects: deps.objects,
            mailer: deps.mailer,
            tokens,
            cache,
            background: BackgroundTasks::new(),
            started_at: Instant::now(),
        }
    }
}

/// Run bcrypt off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(ApiError::server_error)
}
