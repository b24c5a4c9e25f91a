//! Request extractors: identity gates, strict JSON bodies, path ids and
//! listing parameters.

use crate::domain::filters::{ListingQuery, OwnerParam};
use crate::domain::principal::Principal;
use crate::domain::types::User;
use crate::domain::ApiError;
use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{request::Parts, StatusCode},
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use std::collections::HashMap;

/// The request principal, anonymous or not.
pub struct CurrentPrincipal(pub Principal);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentPrincipal)
            .ok_or_else(|| ApiError::server_error("principal missing from request extensions"))
    }
}

/// Any authenticated user, activated or not.
pub struct AuthenticatedUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;
        Ok(Self(principal.require_authenticated()?.clone()))
    }
}

/// An authenticated, activated user.
pub struct ActivatedUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ActivatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;
        Ok(Self(principal.require_activated()?.clone()))
    }
}

/// An activated administrator.
pub struct AdminUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;
        Ok(Self(principal.require_admin()?.clone()))
    }
}

/// Translate a decode failure into a client-facing message.
pub fn describe_json_error(body: &[u8], e: &serde_json::Error) -> String {
    if body.iter().all(u8::is_ascii_whitespace) {
        return "body must not be empty".to_string();
    }
    let message = e.to_string();
    match e.classify() {
        Category::Eof => "body contains badly-formed JSON".to_string(),
        Category::Syntax if message.starts_with("trailing characters") => {
            "body must only contain a single JSON value".to_string()
        }
        Category::Syntax => format!(
            "body contains badly-formed JSON (at line {}, column {})",
            e.line(),
            e.column()
        ),
        Category::Data if message.starts_with("unknown field") => {
            let field = message.split('`').nth(1).unwrap_or_default();
            format!("body contains unknown key \"{}\"", field)
        }
        Category::Data => format!("body contains incorrect JSON: {}", message),
        Category::Io => message,
    }
}

/// Decode a JSON body into `T`, strictly: a single value, bounded by the
/// router's body limit. Pair with `#[serde(deny_unknown_fields)]` on `T`.
pub fn decode_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(describe_json_error(body, &e)))
}

/// Strict JSON body.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "body is larger than the allowed limit")
            } else {
                ApiError::bad_request(rejection.body_text())
            }
        })?;
        decode_json(&bytes).map(JsonBody)
    }
}

/// Positive integer `:id` path segment. Anything else is a 404.
pub struct IdParam(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for IdParam
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found())?;
        match raw.parse::<i64>() {
            Ok(id) if id >= 1 => Ok(Self(id)),
            _ => Err(ApiError::not_found()),
        }
    }
}

/// Parsed listing query string.
pub struct ListingParams {
    pub query: ListingQuery,
    pub owner: OwnerParam,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ListingParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        let (query, owner) = ListingQuery::from_params(&params)?;
        Ok(Self { query, owner })
    }
}
