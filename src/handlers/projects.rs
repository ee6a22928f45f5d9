use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{ProjectListRow, ProjectStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::pagination::{self, Page, PageRequest};
use crate::repository::{ProjectFilters, ProjectRepository, ProjectUpdate, UserRepository};

use super::require_fields;

#[derive(Debug, Deserialize)]
pub struct CreateProjectPayload {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectPayload {
    #[serde(default)]
    pub name: String,
    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    pub name: Option<String>,
    pub team_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    #[serde(default)]
    pub with_stats: bool,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// POST /api/v1/projects - Create a project in the caller's team (Manager only)
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateProjectPayload>,
) -> ApiResult<Value> {
    if !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    require_fields(&[("name", &payload.name)])?;

    let pool = DatabaseManager::pool().await?;

    let manager = UserRepository::new(pool.clone())
        .get_by_id(auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("manager does not exist"))?;

    let team_id = manager
        .team_id
        .ok_or_else(|| ApiError::bad_request("manager has no team"))?;

    let project = ProjectRepository::new(pool)
        .create(&payload.name, team_id, manager.id)
        .await?;

    Ok(ApiResponse::created(json!(project)))
}

/// GET /api/v1/projects - Paginated project listing (Admin or Manager)
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListProjectsQuery>,
) -> ApiResult<Page<ProjectListRow>> {
    if !auth_user.is_admin() && !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    if query.team_id.is_none() && query.manager_id.is_none() {
        return Err(ApiError::bad_request("teamId or managerId required"));
    }

    let page = PageRequest::from_query(query.limit, query.cursor.as_deref())?;

    let pool = DatabaseManager::pool().await?;
    let rows = ProjectRepository::new(pool)
        .list(
            &ProjectFilters {
                team_id: query.team_id,
                manager_id: query.manager_id,
                name: query.name,
                with_stats: query.with_stats,
            },
            &page,
        )
        .await?;

    Ok(ApiResponse::success(pagination::assemble(rows, &page)))
}

/// PUT /api/v1/projects/:id - Update a project (its manager only)
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectPayload>,
) -> ApiResult<Value> {
    if !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    require_fields(&[("name", &payload.name)])?;
    let status = payload
        .status
        .ok_or_else(|| ApiError::bad_request("status is required"))?;

    let pool = DatabaseManager::pool().await?;
    let projects = ProjectRepository::new(pool);

    let existing = projects
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("project not found"))?;

    if existing.manager_id != auth_user.user_id {
        return Err(ApiError::forbidden("unauthorized"));
    }

    let updated = projects
        .update(
            id,
            ProjectUpdate {
                name: payload.name,
                status,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("project not found"))?;

    Ok(ApiResponse::success(json!(updated)))
}

/// DELETE /api/v1/projects/:id - Delete a project (Manager only)
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    let pool = DatabaseManager::pool().await?;
    ProjectRepository::new(pool).delete(id).await?;

    Ok(ApiResponse::success(json!({ "deleted": true })))
}
