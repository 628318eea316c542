use db::models::{
    job_sheet::JobSheet,
    machine::{CreateMachine, Machine, MachineWithWorkload, UpdateMachine},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};
use utils::text::non_blank_str;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("machine not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("a machine named '{0}' already exists")]
    DuplicateName(String),
    #[error("machine has {0} assigned or in-progress jobs and cannot be deleted")]
    HasActiveJobs(i64),
}

impl From<sqlx::Error> for MachineError {
    fn from(err: sqlx::Error) -> Self {
        MachineError::Database(err)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

fn validate_color_capacity(value: Option<i64>, required: bool) -> Result<Option<i64>, MachineError> {
    match value {
        None if required => Err(MachineError::Validation("color_capacity is required".into())),
        None => Ok(None),
        Some(n) if n < 1 => Err(MachineError::Validation(
            "color_capacity must be at least 1".into(),
        )),
        Some(n) => Ok(Some(n)),
    }
}

pub struct MachineService;

impl MachineService {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<MachineWithWorkload>, MachineError> {
        Ok(Machine::find_all_with_workload(pool).await?)
    }

    pub async fn create(pool: &SqlitePool, data: &CreateMachine) -> Result<Machine, MachineError> {
        let name = non_blank_str(data.name.as_deref())
            .ok_or_else(|| MachineError::Validation("name is required".into()))?;
        let color_capacity = validate_color_capacity(data.color_capacity, true)?
            .ok_or_else(|| MachineError::Validation("color_capacity is required".into()))?;

        if Machine::find_by_name(pool, name).await?.is_some() {
            return Err(MachineError::DuplicateName(name.to_string()));
        }

        let machine = Machine::create(pool, Uuid::new_v4(), name, color_capacity, data)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    MachineError::DuplicateName(name.to_string())
                } else {
                    MachineError::Database(err)
                }
            })?;
        info!(machine_id = %machine.id, name = %machine.name, "machine created");
        Ok(machine)
    }

    pub async fn update(pool: &SqlitePool, data: &UpdateMachine) -> Result<Machine, MachineError> {
        let id = data
            .id
            .ok_or_else(|| MachineError::Validation("id is required".into()))?;
        if data.name.is_some() && non_blank_str(data.name.as_deref()).is_none() {
            return Err(MachineError::Validation("name cannot be blank".into()));
        }
        validate_color_capacity(data.color_capacity, false)?;

        let name = non_blank_str(data.name.as_deref());
        if let Some(name) = name
            && let Some(existing) = Machine::find_by_name(pool, name).await?
            && existing.id != id
        {
            return Err(MachineError::DuplicateName(name.to_string()));
        }

        let data = UpdateMachine {
            name: name.map(str::to_string),
            ..data.clone()
        };
        let machine = Machine::update(pool, id, &data)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    MachineError::DuplicateName(data.name.clone().unwrap_or_default())
                } else {
                    MachineError::Database(err)
                }
            })?
            .ok_or(MachineError::NotFound)?;
        info!(machine_id = %machine.id, status = %machine.status, "machine updated");
        Ok(machine)
    }

    /// Removing a machine is refused while jobs are queued or running on it.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), MachineError> {
        let machine = Machine::find_by_id(pool, id)
            .await?
            .ok_or(MachineError::NotFound)?;
        let active = JobSheet::count_active_for_machine(pool, id).await?;
        if active > 0 {
            warn!(machine_id = %id, active, "refusing to delete busy machine");
            return Err(MachineError::HasActiveJobs(active));
        }
        Machine::delete(pool, id).await?;
        info!(machine_id = %id, name = %machine.name, "machine deleted");
        Ok(())
    }
}
