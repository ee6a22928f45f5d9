use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Task, TaskListRow, TaskStatus};
use crate::pagination::{keyset, PageRequest};

#[derive(Debug, Default)]
pub struct TaskFilters {
    pub project_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub title: Option<String>,
}

#[derive(Debug)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Uuid,
    pub user_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct TaskUpdate {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub user_id: Option<Uuid>,
}

pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: NewTask) -> Result<Task, DatabaseError> {
        let now = Utc::now();
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (id, created_at, updated_at, project_id, user_id, status, title, description) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, created_at, updated_at, project_id, user_id, status, title, description",
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(TaskStatus::ToDo)
        .bind(&data.title)
        .bind(&data.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        let task = sqlx::query_as::<_, Task>(
            "SELECT id, created_at, updated_at, project_id, user_id, status, title, description \
             FROM tasks WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    /// Keyset-paginated listing joined with the project name and assignee
    /// username.
    pub async fn list(
        &self,
        filters: &TaskFilters,
        page: &PageRequest,
    ) -> Result<Vec<TaskListRow>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT t.id, t.created_at, t.updated_at, t.project_id, t.user_id, t.status, \
             t.title, t.description, p.name AS project_name, u.username AS user_name \
             FROM tasks t \
             LEFT JOIN projects p ON p.id = t.project_id \
             LEFT JOIN users u ON u.id = t.user_id \
             WHERE TRUE",
        );

        if let Some(project_id) = filters.project_id {
            qb.push(" AND t.project_id = ");
            qb.push_bind(project_id);
        }

        if let Some(user_id) = filters.user_id {
            qb.push(" AND t.user_id = ");
            qb.push_bind(user_id);
        }

        if let Some(cursor) = &page.cursor {
            keyset::push_keyset_range(&mut qb, "t.", cursor);
        }

        if let Some(title) = filters.title.as_deref().filter(|t| !t.is_empty()) {
            qb.push(" AND LOWER(t.title) LIKE ");
            qb.push_bind(format!("%{}%", title.to_lowercase()));
        }

        keyset::push_keyset_order(&mut qb, "t.", page);

        let rows = qb.build_query_as::<TaskListRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn update(&self, id: Uuid, data: TaskUpdate) -> Result<Option<Task>, DatabaseError> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET title = $1, description = $2, status = $3, user_id = $4, updated_at = $5 \
             WHERE id = $6 \
             RETURNING id, created_at, updated_at, project_id, user_id, status, title, description",
        )
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.status)
        .bind(data.user_id)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(task)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
