//! Listing response cache.

pub mod coordinator;

pub use coordinator::{
    cleanup_task as cache_cleanup_task, CacheCoordinator, CacheKey, CacheStats, ReadScope, Viewer,
};
