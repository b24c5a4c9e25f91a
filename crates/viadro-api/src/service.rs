//! Server assembly: state, router, middleware stack and the serve loop.

use crate::adapters::{
    FsObjectStore, InMemoryCacheStore, InMemoryDocumentRepository, InMemoryObjectStore,
    InMemoryTokenRepository, InMemoryUserRepository, LogMailer, SystemTimeSource,
};
use crate::auth::{IdentityResolver, TokenService};
use crate::cache::cache_cleanup_task;
use crate::domain::config::{ConfigError, ServerConfig};
use crate::domain::error::{ApiError, ServerError};
use crate::handlers::{admin, documents, health, users, AppState, Collaborators};
use crate::middleware::{
    cleanup_task, create_cors_layer, IdentityLayer, RateLimitLayer, TracingLayer,
};
use crate::ports::{ObjectStore, TimeSource};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tracing::{info, warn};

/// Rate limit buckets idle this long are dropped.
const BUCKET_MAX_AGE: Duration = Duration::from_secs(180);
const BUCKET_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// The document API server.
pub struct ViadroService {
    state: AppState,
    rate_limit: RateLimitLayer,
}

impl ViadroService {
    /// Assemble the server around the given collaborators.
    pub fn new(config: ServerConfig, deps: Collaborators) -> Result<Self, ServerError> {
        config.validate()?;
        let rate_limit = RateLimitLayer::new(
            config.rate_limit.clone(),
            config.security.trusted_proxies.clone(),
        );
        Ok(Self {
            state: AppState::new(config, deps),
            rate_limit,
        })
    }

    /// Server backed entirely by in-process adapters.
    pub fn in_memory(config: ServerConfig) -> Result<Self, ServerError> {
        let objects = Arc::new(InMemoryObjectStore::new(
            config.storage.public_base_url.clone(),
        ));
        Self::new(config, in_memory_collaborators(objects))
    }

    /// Server storing objects on disk when `storage.root` is set, in memory
    /// otherwise.
    pub async fn open(config: ServerConfig) -> Result<Self, ServerError> {
        let objects: Arc<dyn ObjectStore> = match &config.storage.root {
            Some(root) => {
                let store = FsObjectStore::open(root, config.storage.public_base_url.clone())
                    .await
                    .map_err(|e| {
                        ConfigError::Invalid(format!("storage root {}: {}", root.display(), e))
                    })?;
                info!(root = %root.display(), "objects stored on disk");
                Arc::new(store)
            }
            None => {
                warn!("no storage root configured, objects kept in memory");
                Arc::new(InMemoryObjectStore::new(
                    config.storage.public_base_url.clone(),
                ))
            }
        };
        Self::new(config, in_memory_collaborators(objects))
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tokens(&self) -> &TokenService {
        &self.state.tokens
    }

    /// Build the `/v1` router with the full middleware stack.
    ///
    /// Layer order: Request → Tracing → CORS → RateLimit → Identity → Handler
    pub fn router(&self) -> Router {
        let config = &self.state.config;
        let identity = IdentityLayer::new(IdentityResolver::new(self.state.tokens.clone()));

        let middleware = ServiceBuilder::new()
            .layer(TracingLayer::new())
            .layer(create_cors_layer(&config.cors))
            .layer(self.rate_limit.clone())
            .layer(identity);

        Router::new()
            .route("/v1/healthcheck", get(health::healthcheck))
            .route("/v1/user", post(users::register))
            .route("/v1/user/activate", put(users::activate))
            .route(
                "/v1/user/authenticate",
                put(users::authenticate).delete(users::logout),
            )
            .route("/v1/user/:id", delete(users::delete_user))
            .route("/v1/documents", get(documents::list_documents))
            .route(
                "/v1/document",
                post(documents::add_document)
                    .layer(DefaultBodyLimit::max(config.limits.max_upload_size)),
            )
            .route(
                "/v1/document/:id",
                get(documents::get_document)
                    .delete(documents::delete_document)
                    .patch(documents::toggle_document),
            )
            .route("/v1/admin/users", get(admin::list_users))
            .route("/v1/admin/user/:id", patch(admin::toggle_admin))
            .route("/v1/admin/documents", get(admin::list_all_documents))
            .fallback(not_found)
            .layer(DefaultBodyLimit::max(config.limits.max_json_body))
            .layer(middleware)
            .with_state(self.state.clone())
    }

    /// Serve until `shutdown` resolves, then drain background work.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.http_addr();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {}", addr, e)))?;

        let cleanup = if self.state.config.rate_limit.enabled {
            Some(tokio::spawn(cleanup_task(
                self.rate_limit.state(),
                BUCKET_CLEANUP_INTERVAL,
                BUCKET_MAX_AGE,
            )))
        } else {
            None
        };
        let cache_purge = if self.state.config.cache.enabled {
            Some(tokio::spawn(cache_cleanup_task(
                self.state.cache.clone(),
                CACHE_PURGE_INTERVAL,
            )))
        } else {
            None
        };

        info!(
            addr = %addr,
            environment = %self.state.config.environment,
            "starting server"
        );

        let router = self.router();
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        for handle in [cleanup, cache_purge].into_iter().flatten() {
            handle.abort();
        }

        info!(
            in_flight = self.state.background.in_flight(),
            "listener closed, draining background tasks"
        );
        if self
            .state
            .background
            .drain(self.state.config.shutdown.grace)
            .await
        {
            info!("stopped server");
        }
        Ok(())
    }
}

fn in_memory_collaborators(objects: Arc<dyn ObjectStore>) -> Collaborators {
    let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
    Collaborators {
        users: Arc::new(InMemoryUserRepository::new(Arc::clone(&clock))),
        tokens: Arc::new(InMemoryTokenRepository::new()),
        documents: Arc::new(InMemoryDocumentRepository::new(Arc::clone(&clock))),
        objects,
        cache_store: Arc::new(InMemoryCacheStore::new()),
        mailer: Arc::new(LogMailer),
        clock,
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}
