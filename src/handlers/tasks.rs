use axum::{
    extract::{Extension, Path, Query},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{TaskListRow, TaskStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::pagination::{self, Page, PageRequest};
use crate::repository::{NewTask, ProjectRepository, TaskFilters, TaskRepository, TaskUpdate};

use super::require_fields;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskPayload {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub project_id: Option<Uuid>,
    pub title: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

/// POST /api/v1/tasks - Create a task (Manager only)
pub async fn create(
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<CreateTaskPayload>,
) -> ApiResult<Value> {
    if !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    require_fields(&[("title", &payload.title)])?;
    let project_id = payload
        .project_id
        .ok_or_else(|| ApiError::bad_request("projectId is required"))?;

    let pool = DatabaseManager::pool().await?;

    ProjectRepository::new(pool.clone())
        .get_by_id(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("project not found"))?;

    let task = TaskRepository::new(pool)
        .create(NewTask {
            title: payload.title,
            description: payload.description.filter(|d| !d.is_empty()),
            project_id,
            user_id: payload.user_id,
        })
        .await?;

    Ok(ApiResponse::created(json!(task)))
}

/// GET /api/v1/tasks - Paginated task listing
///
/// Members only ever see their own tasks; Admins and Managers browse by
/// project and must say which one.
pub async fn list(
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Page<TaskListRow>> {
    if !auth_user.is_member() && query.project_id.is_none() {
        return Err(ApiError::bad_request("projectId required"));
    }

    let user_id = auth_user.is_member().then_some(auth_user.user_id);

    let page = PageRequest::from_query(query.limit, query.cursor.as_deref())?;

    let pool = DatabaseManager::pool().await?;
    let rows = TaskRepository::new(pool)
        .list(
            &TaskFilters {
                project_id: query.project_id,
                user_id,
                title: query.title,
            },
            &page,
        )
        .await?;

    Ok(ApiResponse::success(pagination::assemble(rows, &page)))
}

/// PUT /api/v1/tasks/:id - Update a task (Manager only)
pub async fn update(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> ApiResult<Value> {
    if !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    require_fields(&[("title", &payload.title)])?;
    let status = payload
        .status
        .ok_or_else(|| ApiError::bad_request("status is required"))?;

    let pool = DatabaseManager::pool().await?;
    let tasks = TaskRepository::new(pool);

    tasks
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("task not found"))?;

    let updated = tasks
        .update(
            id,
            TaskUpdate {
                title: payload.title,
                description: payload.description.filter(|d| !d.is_empty()),
                status,
                user_id: payload.user_id,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found("task not found"))?;

    Ok(ApiResponse::success(json!(updated)))
}

/// DELETE /api/v1/tasks/:id - Delete a task (Manager only)
pub async fn delete(
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !auth_user.is_manager() {
        return Err(ApiError::forbidden("unauthorized"));
    }

    let pool = DatabaseManager::pool().await?;
    TaskRepository::new(pool).delete(id).await?;

    Ok(ApiResponse::success(json!({ "deleted": true })))
}
