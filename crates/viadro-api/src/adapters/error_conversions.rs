//! Error conversions from infrastructure types.
//!
//! These conversions involve port error types and belong in the adapters layer.

use crate::domain::credentials::CredentialError;
use crate::domain::ApiError;
use crate::ports::{ObjectStoreError, StoreError};

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::not_found(),
            StoreError::DuplicateEmail => {
                ApiError::invalid_field("email", "a user with this email address already exists")
            }
            StoreError::Backend(_) => ApiError::server_error(e),
        }
    }
}

impl From<ObjectStoreError> for ApiError {
    fn from(e: ObjectStoreError) -> Self {
        ApiError::server_error(e)
    }
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        ApiError::server_error(e)
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::server_error(e)
    }
}
