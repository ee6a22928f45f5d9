use axum::{extract::Extension, response::Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, Claims};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{User, UserRole};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::repository::{NewUser, RefreshTokenRepository, UserRepository};

use super::{require_email, require_fields};

#[derive(Debug, Deserialize)]
pub struct RegisterAdminPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshPayload {
    #[serde(default)]
    pub refresh_token: String,
}

/// POST /api/v1/auth/register-admin - Bootstrap an admin account
pub async fn register_admin(Json(payload): Json<RegisterAdminPayload>) -> ApiResult<Value> {
    require_fields(&[
        ("username", &payload.username),
        ("password", &payload.password),
        ("email", &payload.email),
    ])?;
    require_email(&payload.email)?;

    let pool = DatabaseManager::pool().await?;
    let users = UserRepository::new(pool.clone());

    if users.get_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::conflict("user already exists"));
    }

    let hashed = auth::hash_password(&payload.password, config::config().security.bcrypt_cost)?;
    let user = users
        .create(NewUser {
            username: payload.username,
            password: hashed,
            email: payload.email,
            role: UserRole::Admin,
            team_id: None,
        })
        .await?;

    let tokens = RefreshTokenRepository::new(pool);
    let (access_token, refresh_token) = issue_tokens(&user, &tokens).await?;

    Ok(ApiResponse::created(json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
        "user": user,
    })))
}

/// POST /api/v1/auth/login - Verify credentials and issue tokens
pub async fn login(Json(payload): Json<LoginPayload>) -> ApiResult<Value> {
    require_fields(&[("email", &payload.email), ("password", &payload.password)])?;

    let pool = DatabaseManager::pool().await?;
    let users = UserRepository::new(pool.clone());

    // One generic rejection for unknown email and bad password alike.
    let user = users
        .get_by_email(&payload.email)
        .await?
        .ok_or_else(|| ApiError::conflict("invalid email or password"))?;

    if !auth::verify_password(&payload.password, &user.password) {
        return Err(ApiError::conflict("invalid email or password"));
    }

    let tokens = RefreshTokenRepository::new(pool);
    let (access_token, refresh_token) = issue_tokens(&user, &tokens).await?;

    Ok(ApiResponse::success(json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
        "user": user,
    })))
}

/// POST /api/v1/auth/refresh - Rotate the access token
pub async fn refresh(Json(payload): Json<RefreshPayload>) -> ApiResult<Value> {
    require_fields(&[("refreshToken", &payload.refresh_token)])?;

    let pool = DatabaseManager::pool().await?;
    let tokens = RefreshTokenRepository::new(pool.clone());

    let stored = tokens
        .get_by_token(&payload.refresh_token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid refresh token"))?;

    if stored.revoked {
        return Err(ApiError::unauthorized("refresh token has been revoked"));
    }

    if stored.is_expired(Utc::now()) {
        return Err(ApiError::unauthorized("refresh token has expired"));
    }

    let users = UserRepository::new(pool);
    let user = users
        .get_by_id(stored.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid refresh token"))?;

    let secret = &config::config().security.jwt_secret;
    let access_token = auth::generate_token(&Claims::access(&user), secret)?;

    Ok(ApiResponse::success(json!({ "accessToken": access_token })))
}

/// POST /api/v1/auth/logout - Revoke the caller's refresh tokens
pub async fn logout(Extension(auth_user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    RefreshTokenRepository::new(pool)
        .delete_by_user(auth_user.user_id)
        .await?;

    Ok(ApiResponse::success(json!({ "message": "Successfully logged out" })))
}

async fn issue_tokens(
    user: &User,
    tokens: &RefreshTokenRepository,
) -> Result<(String, String), ApiError> {
    let secret = &config::config().security.jwt_secret;

    let access_token = auth::generate_token(&Claims::access(user), secret)?;

    let (refresh_claims, expires_at) = Claims::refresh(user);
    let refresh_token = auth::generate_token(&refresh_claims, secret)?;
    tokens.create(user.id, &refresh_token, expires_at).await?;

    Ok((access_token, refresh_token))
}
