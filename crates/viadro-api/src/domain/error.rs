//! HTTP error responses.
//!
//! Every failure leaves the server as `{"error": <message>}` where the
//! message is a string or a map of field names to messages.

use crate::domain::principal::AccessError;
use crate::domain::validation::FieldErrors;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::fmt;

/// Error payload: a plain message or per-field messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Text(String),
    Fields(FieldErrors),
}

/// API error with HTTP status
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: ErrorMessage,
    /// Adds `WWW-Authenticate: Bearer` to the response
    pub www_authenticate: bool,
    /// Adds `Retry-After` (seconds) to the response
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: ErrorMessage::Text(message.into()),
            www_authenticate: false,
            retry_after: None,
        }
    }

    /// Internal error. Detail goes to the log, never to the client.
    pub fn server_error(detail: impl fmt::Display) -> Self {
        tracing::error!(error = %detail, "request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "the server encountered a problem and could not process your request",
        )
    }

    /// Malformed request body or parameters
    pub fn bad_request(details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, details)
    }

    pub fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "the requested resource could not be found",
        )
    }

    /// Field-level validation failure (422)
    pub fn failed_validation(errors: FieldErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: ErrorMessage::Fields(errors),
            www_authenticate: false,
            retry_after: None,
        }
    }

    /// Single-field validation failure (422)
    pub fn invalid_field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, message);
        Self::failed_validation(errors)
    }

    /// Wrong credentials, or no right to the resource
    pub fn invalid_credentials() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "invalid authentication credentials")
    }

    /// Malformed, unknown or expired bearer token
    pub fn invalid_authentication_token() -> Self {
        let mut err = Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid or missing authentication token",
        );
        err.www_authenticate = true;
        err
    }

    pub fn rate_limited(retry_after_secs: u64) -> Self {
        let mut err = Self::new(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
        err.retry_after = Some(retry_after_secs.max(1));
        err
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            ErrorMessage::Text(text) => write!(f, "[{}] {}", self.status.as_u16(), text),
            ErrorMessage::Fields(fields) => write!(f, "[{}] {:?}", self.status.as_u16(), fields),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a ErrorMessage,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(ErrorBody { error: &self.message })).into_response();
        let headers = response.headers_mut();
        if self.www_authenticate {
            headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        if let Some(secs) = self.retry_after {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        let status = match e {
            AccessError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AccessError::InactiveAccount | AccessError::NotPermitted => StatusCode::FORBIDDEN,
        };
        Self::new(status, e.to_string())
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        Self::failed_validation(errors)
    }
}

/// Server-level errors (startup and shutdown, not request handling)
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    #[error("server bind error: {0}")]
    Bind(String),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}
