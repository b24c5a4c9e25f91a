//! Middleware stack for the document API.
//!
//! Layer order: Request → Tracing → CORS → RateLimit → Identity → Handler

pub mod cors;
pub mod identity;
pub mod rate_limit;
pub mod tracing;

pub use cors::create_cors_layer;
pub use identity::IdentityLayer;
pub use rate_limit::{cleanup_task, RateLimitLayer, RateLimitState};
pub use tracing::TracingLayer;
