use axum::{extract::Extension, response::Json};
use serde::Deserialize;
use serde_json::Value;

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::repository::{TeamRepository, UserRepository};

use super::require_fields;

#[derive(Debug, Deserialize)]
pub struct CreateTeamPayload {
    #[serde(default)]
    pub name: String,
}

/// POST /api/v1/teams - Create the caller's team (Admin only, one per owner)
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateTeamPayload>,
) -> ApiResult<Value> {
    if !auth_user.is_admin() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    require_fields(&[("name", &payload.name)])?;

    let pool = DatabaseManager::pool().await?;

    let users = UserRepository::new(pool.clone());
    users
        .get_by_id(auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let teams = TeamRepository::new(pool);
    if teams.get_by_owner(auth_user.user_id).await?.is_some() {
        return Err(ApiError::conflict("user already owns a team"));
    }

    let team = teams.create(&payload.name, auth_user.user_id).await?;

    Ok(ApiResponse::created(serde_json::json!(team)))
}
