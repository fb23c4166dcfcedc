//! Account routes: login, registration and profile management.

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use memoreal_core::{
    UserId,
    validation::{limits, optional_field, require_field, validate_password},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::GatewayState;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::auth::{AuthError, RequireAuth};
use crate::store::{NewUser, PublicUser, UserProfile, UserUpdate};

/// `{success: true, message}` body.
#[derive(Debug, Serialize)]
pub(super) struct ApiMessage {
    success: bool,
    message: &'static str,
}

impl ApiMessage {
    const fn ok(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LoginResponse {
    success: bool,
    message: &'static str,
    access_token: String,
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub(super) struct RegisterRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    mi: Option<String>,
    username: Option<String>,
    password: Option<String>,
    contact_number: Option<String>,
    email: Option<String>,
    birthdate: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub(super) struct UpdateUserRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    mi: Option<String>,
    contact_number: Option<String>,
    email: Option<String>,
    birthdate: Option<String>,
    picture: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) struct CheckUserQuery {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MeResponse {
    success: bool,
    user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_user_id: Option<UserId>,
}

fn profile(
    first_name: Option<&str>,
    last_name: Option<&str>,
    mi: Option<&str>,
    contact_number: Option<&str>,
    birthdate: Option<&str>,
    picture: Option<&str>,
) -> Result<UserProfile, AuthError> {
    Ok(UserProfile {
        first_name: optional_field("FIRST_NAME", first_name, limits::MAX_FIELD_LENGTH)?,
        last_name: optional_field("LAST_NAME", last_name, limits::MAX_FIELD_LENGTH)?,
        mi: optional_field("MI", mi, limits::MAX_FIELD_LENGTH)?,
        contact_number: optional_field(
            "CONTACT_NUMBER",
            contact_number,
            limits::MAX_FIELD_LENGTH,
        )?,
        birthdate: optional_field("BIRTHDATE", birthdate, limits::MAX_FIELD_LENGTH)?,
        picture: optional_field("PICTURE", picture, limits::MAX_URL_LENGTH)?,
    })
}

fn checked_email(email: String) -> Result<String, AuthError> {
    if email.contains('@') {
        Ok(email)
    } else {
        Err(AuthError::Validation("EMAIL is invalid".to_string()))
    }
}

/// Treat a whitespace-only password as absent.
fn non_blank(password: Option<String>) -> Option<String> {
    password.filter(|p| !p.trim().is_empty())
}

pub(super) async fn login(
    State(state): State<GatewayState>,
    session: Option<Extension<Session>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let auth = &state.auth;
    let username = require_field(
        "username",
        request.username.as_deref(),
        limits::MAX_USERNAME_LENGTH,
    )?;
    let Some(password) = request.password.filter(|p| !p.is_empty()) else {
        return Err(AuthError::Validation("password is required".to_string()));
    };

    if !auth.login_limiter.check(&username) {
        tracing::warn!(%username, "Login rate limit exceeded");
        return Err(AuthError::RateLimited);
    }

    let Some(user) = state.store.find_by_username(&username).await? else {
        tracing::debug!(%username, "Login for unknown user");
        return Err(if auth.config.unify_login_errors {
            AuthError::InvalidCredentials
        } else {
            AuthError::UserNotFound
        });
    };

    if !auth
        .hasher
        .verify_async(password, user.password_hash.clone())
        .await
    {
        tracing::debug!(user_id = %user.id, "Login with wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let issued = auth.tokens.issue(user.id)?;
    auth.sessions.bind(session.as_deref(), user.id).await;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful",
        access_token: issued.token,
        user_id: user.id,
        expires_at: issued.expires_at,
    }))
}

pub(super) async fn logout(
    State(state): State<GatewayState>,
    session: Option<Extension<Session>>,
) -> Json<ApiMessage> {
    state.auth.sessions.clear(session.as_deref()).await;
    ApiMessage::ok("Logged out successfully")
}

pub(super) async fn add_user(
    State(state): State<GatewayState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiMessage>), AuthError> {
    let username = require_field(
        "USERNAME",
        request.username.as_deref(),
        limits::MAX_USERNAME_LENGTH,
    )?;
    let email = checked_email(require_field(
        "EMAIL",
        request.email.as_deref(),
        limits::MAX_FIELD_LENGTH,
    )?)?;
    let password = non_blank(request.password);
    validate_password(password.as_deref())?;
    let profile = profile(
        request.first_name.as_deref(),
        request.last_name.as_deref(),
        request.mi.as_deref(),
        request.contact_number.as_deref(),
        request.birthdate.as_deref(),
        request.picture.as_deref(),
    )?;

    let password_hash = state
        .auth
        .hasher
        .hash_async(password.unwrap_or_default())
        .await?;

    let user_id = state
        .store
        .insert(NewUser {
            username,
            email,
            password_hash,
            profile,
        })
        .await?;
    tracing::info!(%user_id, "User registered");

    Ok((
        StatusCode::CREATED,
        ApiMessage::ok("User registered successfully"),
    ))
}

pub(super) async fn check_user(
    State(state): State<GatewayState>,
    ApiQuery(query): ApiQuery<CheckUserQuery>,
) -> Result<Json<ApiMessage>, AuthError> {
    let username = require_field(
        "USERNAME",
        query.username.as_deref(),
        limits::MAX_USERNAME_LENGTH,
    )?;
    let email = require_field("EMAIL", query.email.as_deref(), limits::MAX_FIELD_LENGTH)?;

    if state.store.is_taken(&username, &email).await? {
        return Err(AuthError::UserExists);
    }
    Ok(ApiMessage::ok("Username and Email are available"))
}

pub(super) async fn me(
    auth: RequireAuth,
    State(state): State<GatewayState>,
    session: Option<Extension<Session>>,
) -> Json<MeResponse> {
    let session_user_id = state.auth.sessions.bound_user(session.as_deref()).await;
    Json(MeResponse {
        success: true,
        user_id: auth.user_id,
        session_user_id,
    })
}

pub(super) async fn list_users(
    _auth: RequireAuth,
    State(state): State<GatewayState>,
) -> Result<Json<Vec<PublicUser>>, AuthError> {
    let users = state.store.list().await?;
    Ok(Json(users.iter().map(|u| u.to_public()).collect()))
}

pub(super) async fn fetch_user(
    _auth: RequireAuth,
    State(state): State<GatewayState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<PublicUser>, AuthError> {
    state
        .store
        .find_by_id(UserId::new(id))
        .await?
        .map(|user| Json(user.to_public()))
        .ok_or(AuthError::UserNotFound)
}

pub(super) async fn update_user(
    auth: RequireAuth,
    State(state): State<GatewayState>,
    ApiPath(username): ApiPath<String>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<ApiMessage>, AuthError> {
    let target = state
        .store
        .find_by_username(&username)
        .await?
        .ok_or(AuthError::UserNotFound)?;
    if target.id != auth.user_id {
        return Err(AuthError::PermissionDenied(
            "Cannot modify another account".to_string(),
        ));
    }

    let email = optional_field("EMAIL", request.email.as_deref(), limits::MAX_FIELD_LENGTH)?
        .map(checked_email)
        .transpose()?;
    let profile = profile(
        request.first_name.as_deref(),
        request.last_name.as_deref(),
        request.mi.as_deref(),
        request.contact_number.as_deref(),
        request.birthdate.as_deref(),
        request.picture.as_deref(),
    )?;

    let password_hash = match non_blank(request.password) {
        Some(password) => {
            validate_password(Some(&password))?;
            Some(state.auth.hasher.hash_async(password).await?)
        }
        None => None,
    };

    let updated = state
        .store
        .update(
            &username,
            UserUpdate {
                email,
                password_hash,
                profile,
            },
        )
        .await?;
    if !updated {
        return Err(AuthError::UserNotFound);
    }

    tracing::info!(user_id = %auth.user_id, "User updated");
    Ok(ApiMessage::ok("Updated user information successfully"))
}

pub(super) async fn delete_user(
    auth: RequireAuth,
    State(state): State<GatewayState>,
    session: Option<Extension<Session>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ApiMessage>, AuthError> {
    let target = UserId::new(id);
    if target != auth.user_id {
        return Err(AuthError::PermissionDenied(
            "Cannot delete another account".to_string(),
        ));
    }

    if !state.store.delete(target).await? {
        return Err(AuthError::UserNotFound);
    }
    state.auth.sessions.clear(session.as_deref()).await;

    tracing::info!(user_id = %target, "User deleted");
    Ok(ApiMessage::ok("User deleted successfully"))
}
