use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{User, UserRole};
use crate::pagination::{keyset, PageRequest};

#[derive(Debug, Default)]
pub struct UserFilters {
    pub team_id: Option<Uuid>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: UserRole,
    pub team_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct UserUpdate {
    pub username: String,
    pub email: String,
}

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: NewUser) -> Result<User, DatabaseError> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, created_at, updated_at, username, password, email, role, team_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, created_at, updated_at, username, password, email, role, team_id",
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(&data.username)
        .bind(&data.password)
        .bind(&data.email)
        .bind(data.role)
        .bind(data.team_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, username, password, email, role, team_id \
             FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, created_at, updated_at, username, password, email, role, team_id \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Keyset-paginated listing. Returns up to `limit + 1` rows in fetch
    /// order; the paginator trims and reorders them.
    pub async fn list(
        &self,
        filters: &UserFilters,
        page: &PageRequest,
    ) -> Result<Vec<User>, DatabaseError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT id, created_at, updated_at, username, password, email, role, team_id \
             FROM users WHERE TRUE",
        );

        if let Some(team_id) = filters.team_id {
            qb.push(" AND team_id = ");
            qb.push_bind(team_id);
        }

        if let Some(cursor) = &page.cursor {
            keyset::push_keyset_range(&mut qb, "", cursor);
        }

        if let Some(email) = filters.email.as_deref().filter(|e| !e.is_empty()) {
            qb.push(" AND LOWER(email) LIKE ");
            qb.push_bind(format!("%{}%", email.to_lowercase()));
        }

        if let Some(role) = filters.role {
            qb.push(" AND role = ");
            qb.push_bind(role);
        }

        keyset::push_keyset_order(&mut qb, "", page);

        let rows = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    pub async fn update(&self, id: Uuid, data: UserUpdate) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET username = $1, email = $2, updated_at = $3 WHERE id = $4 \
             RETURNING id, created_at, updated_at, username, password, email, role, team_id",
        )
        .bind(&data.username)
        .bind(&data.email)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
