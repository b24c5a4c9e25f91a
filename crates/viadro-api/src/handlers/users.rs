//! Registration, activation, authentication and account deletion.

use crate::adapters::mailer::welcome_email;
use crate::auth::tokens::{TokenError, TOKEN_LENGTH};
use crate::domain::credentials::PasswordHash;
use crate::domain::types::{NewUser, TokenScope, UserId};
use crate::domain::validation::{validate_email, validate_password, validate_username, FieldErrors};
use crate::domain::ApiError;
use crate::handlers::blocking;
use crate::handlers::extract::{ActivatedUser, AuthenticatedUser, IdParam, JsonBody};
use crate::handlers::AppState;
use crate::ports::StoreError;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

fn token_error(e: TokenError) -> ApiError {
    ApiError::server_error(e)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterInput {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `POST /v1/user`
pub async fn register(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();
    validate_username(&mut errors, &input.username);
    validate_email(&mut errors, &input.email);
    validate_password(&mut errors, &input.password);
    errors.into_result()?;

    let cost = state.config.security.bcrypt_cost;
    let password = input.password;
    let hash = blocking(move || PasswordHash::set_with_cost(&password, cost)).await??;

    let user = state
        .users
        .insert(NewUser {
            username: input.username.trim().to_string(),
            email: input.email,
            password: hash,
            activated: false,
            is_admin: false,
        })
        .await?;

    let token = state
        .tokens
        .mint(
            user.id,
            state.config.tokens.activation_ttl,
            TokenScope::Activation,
        )
        .await
        .map_err(token_error)?;

    info!(user_id = %user.id, "user registered");

    let mail = welcome_email(
        &state.config.mail.sender,
        &user,
        &token.plaintext,
        state.config.tokens.activation_ttl,
    );
    let mailer = state.mailer.clone();
    let user_id = user.id;
    state.background.spawn("welcome_email", async move {
        if let Err(e) = mailer.send(mail).await {
            error!(user_id = %user_id, error = %e, "failed to send welcome email");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "user": user }))))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateInput {
    #[serde(default)]
    pub token: String,
}

/// `PUT /v1/user/activate`
pub async fn activate(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ActivateInput>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = FieldErrors::new();
    errors.check(!input.token.is_empty(), "token", "must be provided");
    errors.check(
        input.token.len() == TOKEN_LENGTH,
        "token",
        "must be 26 bytes long",
    );
    errors.into_result()?;

    let mut user = match state
        .tokens
        .verify(TokenScope::Activation, &input.token)
        .await
    {
        Ok(user) => user,
        Err(TokenError::NotFound) => {
            return Err(ApiError::invalid_field(
                "token",
                "invalid or expired activation token",
            ))
        }
        Err(e) => return Err(token_error(e)),
    };

    user.activated = true;
    let user = state.users.update(&user).await?;

    state
        .tokens
        .revoke_all(TokenScope::Activation, user.id)
        .await
        .map_err(token_error)?;

    info!(user_id = %user.id, "user activated");
    Ok(Json(json!({ "user": user })))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthenticateInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `PUT /v1/user/authenticate`
pub async fn authenticate(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<AuthenticateInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = match state.users.get_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            // Same bcrypt work as a wrong password
            let cost = state.config.security.bcrypt_cost;
            let password = input.password;
            blocking(move || PasswordHash::set_with_cost(&password, cost)).await??;
            warn!("authentication failed: unknown email");
            return Err(ApiError::invalid_credentials());
        }
        Err(e) => return Err(e.into()),
    };

    let hash = user.password.clone();
    let password = input.password;
    if !blocking(move || hash.matches(&password)).await?? {
        warn!(user_id = %user.id, "authentication failed: wrong password");
        return Err(ApiError::invalid_credentials());
    }

    let token = state
        .tokens
        .mint(
            user.id,
            state.config.tokens.authentication_ttl,
            TokenScope::Authentication,
        )
        .await
        .map_err(token_error)?;

    info!(user_id = %user.id, "user authenticated");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "authentication_token": token })),
    ))
}

/// `DELETE /v1/user/authenticate`: sign out of every session.
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let revoked = state
        .tokens
        .revoke_all(TokenScope::Authentication, user.id)
        .await
        .map_err(token_error)?;

    info!(user_id = %user.id, revoked, "user signed out");
    Ok(Json(json!({ "message": "signed out of all sessions" })))
}

/// `DELETE /v1/user/:id`: the account, its tokens and its documents.
pub async fn delete_user(
    State(state): State<AppState>,
    ActivatedUser(caller): ActivatedUser,
    IdParam(id): IdParam,
) -> Result<impl IntoResponse, ApiError> {
    let target = UserId(id);
    if caller.id != target && !caller.is_admin {
        return Err(ApiError::invalid_credentials());
    }

    let user = state.users.get(target).await?;

    // Stored object before its row, same order as a single document delete
    let documents = state.documents.list_by_owner(user.id).await?;
    for document in &documents {
        state.objects.delete(&document.storage_key).await?;
        match state.documents.delete(document.id).await {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
    }

    state
        .tokens
        .revoke_user(user.id)
        .await
        .map_err(token_error)?;
    state.users.delete(user.id).await?;
    state.cache.invalidate_all().await;

    info!(
        user_id = %user.id,
        deleted_by = %caller.id,
        documents = documents.len(),
        "user deleted"
    );
    Ok(Json(json!({ "message": "user successfully deleted" })))
}
