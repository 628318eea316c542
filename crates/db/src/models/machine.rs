use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

const MACHINE_COLUMNS: &str = "id, name, machine_type, color_capacity, status, operator_name, \
    operator_email, description, created_at, updated_at";

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "machine_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MachineStatus {
    #[default]
    Active,
    Maintenance,
    Offline,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Machine {
    pub id: Uuid,
    pub name: String,
    pub machine_type: Option<String>,
    pub color_capacity: i64,
    pub status: MachineStatus,
    pub operator_name: Option<String>,
    pub operator_email: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Machine plus the number of jobs currently queued or running on it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MachineWithWorkload {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub machine: Machine,
    pub active_jobs: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct CreateMachine {
    pub name: Option<String>,
    pub machine_type: Option<String>,
    pub color_capacity: Option<i64>,
    pub status: Option<MachineStatus>,
    pub operator_name: Option<String>,
    pub operator_email: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateMachine {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub machine_type: Option<String>,
    pub color_capacity: Option<i64>,
    pub status: Option<MachineStatus>,
    pub operator_name: Option<String>,
    pub operator_email: Option<String>,
    pub description: Option<String>,
}

impl Machine {
    pub async fn find_all_with_workload(pool: &SqlitePool) -> Result<Vec<MachineWithWorkload>, sqlx::Error> {
        sqlx::query_as::<_, MachineWithWorkload>(
            "SELECT m.id, m.name, m.machine_type, m.color_capacity, m.status, m.operator_name,
                    m.operator_email, m.description, m.created_at, m.updated_at,
                    (SELECT COUNT(*) FROM job_sheets j
                      WHERE j.machine_id = m.id
                        AND j.is_deleted = 0
                        AND j.job_status IN ('assigned', 'in_progress')) AS active_jobs
             FROM machines m
             ORDER BY m.name ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let sql = format!("SELECT {MACHINE_COLUMNS} FROM machines WHERE id = $1");
        sqlx::query_as::<_, Machine>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Case-insensitive lookup; names are unique regardless of case.
    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {MACHINE_COLUMNS} FROM machines WHERE lower(name) = lower($1)");
        sqlx::query_as::<_, Machine>(&sql)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        id: Uuid,
        name: &str,
        color_capacity: i64,
        data: &CreateMachine,
    ) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO machines
                (id, name, machine_type, color_capacity, status, operator_name, operator_email, description)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {MACHINE_COLUMNS}"
        );
        sqlx::query_as::<_, Machine>(&sql)
            .bind(id)
            .bind(name)
            .bind(&data.machine_type)
            .bind(color_capacity)
            .bind(data.status.unwrap_or_default())
            .bind(&data.operator_name)
            .bind(&data.operator_email)
            .bind(&data.description)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateMachine,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE machines
             SET name = COALESCE($2, name),
                 machine_type = COALESCE($3, machine_type),
                 color_capacity = COALESCE($4, color_capacity),
                 status = COALESCE($5, status),
                 operator_name = COALESCE($6, operator_name),
                 operator_email = COALESCE($7, operator_email),
                 description = COALESCE($8, description),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {MACHINE_COLUMNS}"
        );
        sqlx::query_as::<_, Machine>(&sql)
            .bind(id)
            .bind(&data.name)
            .bind(&data.machine_type)
            .bind(data.color_capacity)
            .bind(data.status)
            .bind(&data.operator_name)
            .bind(&data.operator_email)
            .bind(&data.description)
            .fetch_optional(pool)
            .await
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM machines")
            .fetch_one(pool)
            .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM machines WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn name_lookup_ignores_case() {
        let (db, _dir) = test_db().await;
        let created = Machine::create(&db.pool, Uuid::new_v4(), "Komori L40", 4, &CreateMachine::default())
            .await
            .unwrap();
        assert_eq!(created.status, MachineStatus::Active);

        let found = Machine::find_by_name(&db.pool, "komori l40").await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(created.id));

        let listed = Machine::find_all_with_workload(&db.pool).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].active_jobs, 0);
    }
}
