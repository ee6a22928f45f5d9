use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth;
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::{User, UserRole};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::pagination::{self, Page, PageRequest};
use crate::repository::{NewUser, UserFilters, UserRepository, UserUpdate};

use super::{require_email, require_fields};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<UserRole>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserPayload {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub email: Option<String>,
    pub team_id: Option<Uuid>,
    pub role: Option<UserRole>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExistsByEmailQuery {
    pub email: Option<String>,
}

/// POST /api/v1/users - Create a user (Admin only)
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateUserPayload>,
) -> ApiResult<Value> {
    if !auth_user.is_admin() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    require_fields(&[
        ("username", &payload.username),
        ("email", &payload.email),
        ("password", &payload.password),
    ])?;
    require_email(&payload.email)?;
    let role = payload
        .role
        .ok_or_else(|| ApiError::bad_request("role is required"))?;

    let pool = DatabaseManager::pool().await?;
    let users = UserRepository::new(pool);

    if users.get_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::conflict("user already exists"));
    }

    let hashed = auth::hash_password(&payload.password, config::config().security.bcrypt_cost)?;
    let user = users
        .create(NewUser {
            username: payload.username,
            password: hashed,
            email: payload.email,
            role,
            team_id: payload.team_id,
        })
        .await?;

    Ok(ApiResponse::created(json!({ "user": user })))
}

/// GET /api/v1/users - Paginated user listing (Admin or Manager)
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Page<User>> {
    if !auth_user.is_admin() && !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    let team_id = query
        .team_id
        .ok_or_else(|| ApiError::bad_request("teamId is required"))?;

    let page = PageRequest::from_query(query.limit, query.cursor.as_deref())?;

    let pool = DatabaseManager::pool().await?;
    let rows = UserRepository::new(pool)
        .list(
            &UserFilters {
                team_id: Some(team_id),
                email: query.email,
                role: query.role,
            },
            &page,
        )
        .await?;

    Ok(ApiResponse::success(pagination::assemble(rows, &page)))
}

/// GET /api/v1/users/exists-by-email - Public email availability check
pub async fn exists_by_email(Query(query): Query<ExistsByEmailQuery>) -> ApiResult<Value> {
    let email = query
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::bad_request("email is required"))?;

    let pool = DatabaseManager::pool().await?;
    let exists = UserRepository::new(pool).get_by_email(&email).await?.is_some();

    Ok(ApiResponse::success(json!({ "exists": exists })))
}

/// PUT /api/v1/users/:id - Update username/email (Admin only)
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> ApiResult<Value> {
    if !auth_user.is_admin() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    require_fields(&[("username", &payload.username), ("email", &payload.email)])?;
    require_email(&payload.email)?;

    let pool = DatabaseManager::pool().await?;
    let users = UserRepository::new(pool);

    let current = users
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    // Changing the address must not collide with another account.
    if current.email != payload.email && users.get_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::conflict("user already exists"));
    }

    let updated = users
        .update(
            id,
            UserUpdate {
                username: payload.username,
                email: payload.email,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(ApiResponse::success(json!(updated)))
}

/// DELETE /api/v1/users/:id - Delete a user (Admin only)
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !auth_user.is_admin() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    let pool = DatabaseManager::pool().await?;
    UserRepository::new(pool).delete(id).await?;

    Ok(ApiResponse::success(json!({ "deleted": true })))
}
