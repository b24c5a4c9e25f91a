//! Domain types for the document API.
//!
//! Entities, configuration, access policy and HTTP error mapping. Nothing here
//! performs I/O; repositories and stores live behind `crate::ports`.

pub mod config;
pub mod correlation;
pub mod credentials;
pub mod error;
pub mod filters;
pub mod policy;
pub mod principal;
pub mod types;
pub mod validation;

// Re-exports for convenience
pub use config::{ConfigError, ServerConfig};
pub use correlation::RequestId;
pub use credentials::{CredentialError, PasswordHash};
pub use error::{ApiError, ErrorMessage, ServerError};
pub use filters::{ListingQuery, Metadata, OwnerParam, SortField, SortKey};
pub use policy::{can_mutate, can_read, list_filter, ListFilter, ListingScope, OwnerFilter};
pub use principal::{AccessError, Principal};
pub use types::*;
pub use validation::FieldErrors;
