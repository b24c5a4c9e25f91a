//! Viadro: a document hosting API.
//!
//! Users upload files to object storage, browse public ones and manage the
//! visibility of their own. The interesting parts sit behind thin CRUD
//! plumbing:
//!
//! - [`auth`]: opaque, hashed, scoped bearer tokens and the identity resolver
//! - [`domain::policy`]: read / mutate decisions on documents
//! - [`cache`]: the response cache in front of the document listings
//!
//! # Request flow
//!
//! ```text
//! Request → Tracing → CORS → RateLimit → Identity → Handler
//!                                           │           │
//!                                     Principal    policy / cache
//!                                                       │
//!                                          ports (users, tokens, documents,
//!                                          objects, cache store, mailer)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use viadro_api::{ServerConfig, ViadroService};
//!
//! let service = ViadroService::in_memory(ServerConfig::default())?;
//! let router = service.router();
//! ```

pub mod adapters;
pub mod auth;
pub mod background;
pub mod cache;
pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod service;

pub use domain::{ApiError, ServerConfig, ServerError};
pub use handlers::{AppState, Collaborators};
pub use service::ViadroService;
