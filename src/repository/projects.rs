use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Project, ProjectListRow, ProjectStatus};
use crate::pagination::{keyset, PageRequest};

#[derive(Debug, Default)]
pub struct ProjectFilters {
    pub team_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub name: Option<String>,
    pub with_stats: bool,
}

#[derive(Debug)]
pub struct ProjectUpdate {
    pub name: String,
    pub status: ProjectStatus,
}

pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        name: &str,
        team_id: Uuid,
        manager_id: Uuid,
    ) -> Result<Project, DatabaseError> {
        let now = Utc::now();
        let project = sqlx::query_as::<_, Project>(
            "INSERT INTO projects (id, created_at, updated_at, name, team_id, manager_id, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, created_at, updated_at, name, team_id, manager_id, status",
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(team_id)
        .bind(manager_id)
        .bind(ProjectStatus::OnHold)
        .fetch_one(&self.pool)
        .await?;

        Ok(project)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(
            "SELECT id, created_at, updated_at, name, team_id, manager_id, status \
             FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(project)
    }

    /// Keyset-paginated listing, optionally aggregating per-status task
    /// counts for each project.
    pub async fn list(
        &self,
        filters: &ProjectFilters,
        page: &PageRequest,
    ) -> Result<Vec<ProjectListRow>, DatabaseError> {
        let mut qb = if filters.with_stats {
            QueryBuilder::<Postgres>::new(
                "SELECT p.id, p.created_at, p.updated_at, p.name, p.team_id, p.manager_id, p.status, \
                 COUNT(t.id) FILTER (WHERE t.status = 'ToDo') AS to_do_tasks, \
                 COUNT(t.id) FILTER (WHERE t.status = 'InProgress') AS in_progress_tasks, \
                 COUNT(t.id) FILTER (WHERE t.status = 'Done') AS done_tasks \
                 FROM projects p LEFT JOIN tasks t ON t.project_id = p.id WHERE TRUE",
            )
        } else {
            QueryBuilder::<Postgres>::new(
                "SELECT p.id, p.created_at, p.updated_at, p.name, p.team_id, p.manager_id, p.status \
                 FROM projects p WHERE TRUE",
            )
        };

        if let Some(team_id) = filters.team_id {
            qb.push(" AND p.team_id = ");
            qb.push_bind(team_id);
        }

        if let Some(manager_id) = filters.manager_id {
            qb.push(" AND p.manager_id = ");
            qb.push_bind(manager_id);
        }

        if let Some(cursor) = &page.cursor {
            keyset::push_keyset_range(&mut qb, "p.", cursor);
        }

        if let Some(name) = filters.name.as_deref().filter(|n| !n.is_empty()) {
            qb.push(" AND LOWER(p.name) LIKE ");
            qb.push_bind(format!("%{}%", name.to_lowercase()));
        }

        if filters.with_stats {
            qb.push(" GROUP BY p.id");
        }

        keyset::push_keyset_order(&mut qb, "p.", page);

        let rows = qb
            .build_query_as::<ProjectListRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn update(
        &self,
        id: Uuid,
        data: ProjectUpdate,
    ) -> Result<Option<Project>, DatabaseError> {
        let project = sqlx::query_as::<_, Project>(
            "UPDATE projects SET name = $1, status = $2, updated_at = $3 WHERE id = $4 \
             RETURNING id, created_at, updated_at, name, team_id, manager_id, status",
        )
        .bind(&data.name)
        .bind(data.status)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(project)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
