//! Administrator endpoints.

use crate::domain::policy::{list_filter, ListingScope};
use crate::domain::principal::Principal;
use crate::domain::types::UserId;
use crate::domain::ApiError;
use crate::handlers::documents::serve_listing;
use crate::handlers::extract::{AdminUser, IdParam, ListingParams};
use crate::handlers::AppState;
use crate::ports::StoreError;
use axum::{extract::State, response::IntoResponse, response::Response, Json};
use serde_json::json;
use tracing::info;

/// `GET /v1/admin/users`
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(json!({ "users": users })))
}

/// `PATCH /v1/admin/user/:id`: grant or revoke the admin flag.
pub async fn toggle_admin(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    IdParam(id): IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = match state.users.get(UserId(id)).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(ApiError::invalid_field("user", "user not found")),
        Err(e) => return Err(e.into()),
    };

    user.is_admin = !user.is_admin;
    let user = state.users.update(&user).await?;

    info!(
        user_id = %user.id,
        is_admin = user.is_admin,
        changed_by = %admin.id,
        "admin flag toggled"
    );
    Ok(Json(json!({ "user": user })))
}

/// `GET /v1/admin/documents`: every document, hidden ones included.
pub async fn list_all_documents(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ListingParams { query, .. }: ListingParams,
) -> Result<Response, ApiError> {
    let principal = Principal::Authenticated(admin);
    let filter = list_filter(&principal, ListingScope::Admin)?;
    serve_listing(&state, &principal, filter, &query).await
}
