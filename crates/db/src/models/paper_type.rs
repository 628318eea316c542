use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct PaperType {
    pub id: Uuid,
    pub name: String,
    pub gsm: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreatePaperType {
    pub name: Option<String>,
    pub gsm: Option<i64>,
}

impl PaperType {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PaperType>(
            "SELECT id, name, gsm, created_at FROM paper_types ORDER BY name ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, PaperType>("SELECT id, name, gsm, created_at FROM paper_types WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PaperType>(
            "SELECT id, name, gsm, created_at FROM paper_types WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        name: &str,
        gsm: Option<i64>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PaperType>(
            "INSERT INTO paper_types (id, name, gsm)
             VALUES ($1, $2, $3)
             RETURNING id, name, gsm, created_at",
        )
        .bind(id)
        .bind(name)
        .bind(gsm)
        .fetch_one(pool)
        .await
    }
}
