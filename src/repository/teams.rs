use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Team;

pub struct TeamRepository {
    pool: PgPool,
}

impl TeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, name: &str, owner_id: Uuid) -> Result<Team, DatabaseError> {
        let now = Utc::now();
        let team = sqlx::query_as::<_, Team>(
            "INSERT INTO teams (id, created_at, updated_at, name, owner_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, created_at, updated_at, name, owner_id",
        )
        .bind(Uuid::new_v4())
        .bind(now)
        .bind(now)
        .bind(name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(team)
    }

    pub async fn get_by_owner(&self, owner_id: Uuid) -> Result<Option<Team>, DatabaseError> {
        let team = sqlx::query_as::<_, Team>(
            "SELECT id, created_at, updated_at, name, owner_id FROM teams WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(team)
    }
}
