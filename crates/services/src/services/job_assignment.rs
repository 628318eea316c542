//! Operator-side workflow: putting jobs on machines and moving them through
//! `pending -> assigned -> in_progress -> completed`, with `cancelled`
//! reachable from any non-terminal state.

use db::models::{
    job_sheet::{JobSheet, JobSheetFilter, JobStatus},
    machine::{Machine, MachineStatus},
    operator_notification::{NotificationType, OperatorNotification},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::text::non_blank_str;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JobAssignmentError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("job not found")]
    JobNotFound,
    #[error("machine not found")]
    MachineNotFound,
    #[error("job is not assigned to this machine")]
    WrongMachine,
    #[error("cannot move job from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
    #[error("{0}")]
    Validation(String),
}

/// Body of `PUT /jobs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct JobStatusUpdate {
    pub job_id: Option<Uuid>,
    pub machine_id: Option<Uuid>,
    pub status: Option<JobStatus>,
    pub operator_notes: Option<String>,
}

/// Body of `POST /job-sheets/{id}/assign`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct AssignJob {
    pub machine_id: Option<Uuid>,
}

pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    use JobStatus::*;
    matches!(
        (from, to),
        (Pending, Assigned)
            | (Assigned, InProgress)
            | (InProgress, Completed)
            | (Pending | Assigned | InProgress, Cancelled)
    )
}

fn status_message(job: &JobSheet, status: JobStatus) -> (NotificationType, String) {
    match status {
        JobStatus::Cancelled => (
            NotificationType::JobCancelled,
            format!("Job \"{}\" was cancelled", job.description),
        ),
        _ => (
            NotificationType::JobUpdated,
            format!("Job \"{}\" is now {}", job.description, status),
        ),
    }
}

pub struct JobAssignmentService;

impl JobAssignmentService {
    pub async fn jobs_for_machine(
        pool: &SqlitePool,
        machine_id: Uuid,
        status: Option<JobStatus>,
    ) -> Result<Vec<JobSheet>, JobAssignmentError> {
        Machine::find_by_id(pool, machine_id)
            .await?
            .ok_or(JobAssignmentError::MachineNotFound)?;
        let filter = JobSheetFilter {
            machine_id: Some(machine_id),
            status,
            limit: Some(500),
            ..Default::default()
        };
        Ok(JobSheet::find(pool, &filter).await?)
    }

    pub async fn assign(
        pool: &SqlitePool,
        job_id: Uuid,
        machine_id: Uuid,
    ) -> Result<JobSheet, JobAssignmentError> {
        let mut tx = db::begin_write(pool).await?;
        let job = JobSheet::find_by_id(&mut *tx, job_id)
            .await?
            .filter(|j| !j.is_deleted)
            .ok_or(JobAssignmentError::JobNotFound)?;
        let machine = Machine::find_by_id(&mut *tx, machine_id)
            .await?
            .ok_or(JobAssignmentError::MachineNotFound)?;
        if machine.status == MachineStatus::Offline {
            return Err(JobAssignmentError::Validation(format!(
                "machine '{}' is offline",
                machine.name
            )));
        }
        if !can_transition(job.job_status, JobStatus::Assigned) {
            return Err(JobAssignmentError::InvalidTransition {
                from: job.job_status,
                to: JobStatus::Assigned,
            });
        }

        let job = JobSheet::assign_to_machine(&mut *tx, job_id, machine_id).await?;
        OperatorNotification::create(
            &mut *tx,
            machine_id,
            Some(job_id),
            NotificationType::JobAssigned,
            "New job assigned",
            &format!("Job \"{}\" has been added to your queue", job.description),
        )
        .await?;
        tx.commit().await?;

        info!(job_id = %job_id, machine_id = %machine_id, "job assigned");
        Ok(job)
    }

    /// Move a job forward and notify its machine.
    pub async fn update_status(
        pool: &SqlitePool,
        request: &JobStatusUpdate,
    ) -> Result<JobSheet, JobAssignmentError> {
        let job_id = request
            .job_id
            .ok_or_else(|| JobAssignmentError::Validation("job_id is required".into()))?;
        let machine_id = request
            .machine_id
            .ok_or_else(|| JobAssignmentError::Validation("machine_id is required".into()))?;
        let status = request
            .status
            .ok_or_else(|| JobAssignmentError::Validation("status is required".into()))?;

        let mut tx = db::begin_write(pool).await?;
        let job = JobSheet::find_by_id(&mut *tx, job_id)
            .await?
            .filter(|j| !j.is_deleted)
            .ok_or(JobAssignmentError::JobNotFound)?;
        if job.machine_id != Some(machine_id) {
            return Err(JobAssignmentError::WrongMachine);
        }
        if !can_transition(job.job_status, status) {
            return Err(JobAssignmentError::InvalidTransition {
                from: job.job_status,
                to: status,
            });
        }

        let notes = non_blank_str(request.operator_notes.as_deref());
        let updated = JobSheet::update_status(&mut *tx, job_id, status, notes).await?;
        let (kind, message) = status_message(&updated, status);
        OperatorNotification::create(
            &mut *tx,
            machine_id,
            Some(job_id),
            kind,
            "Job status updated",
            &message,
        )
        .await?;
        tx.commit().await?;

        info!(job_id = %job_id, from = %job.job_status, to = %status, "job status updated");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use db::models::{job_sheet::CreateJobSheet, machine::CreateMachine};

    use super::*;
    use crate::test_support::test_db;

    async fn seed(pool: &SqlitePool) -> (Machine, JobSheet) {
        let machine = Machine::create(pool, Uuid::new_v4(), "Komori", 4, &CreateMachine::default())
            .await
            .unwrap();
        let job = JobSheet::create(pool, Uuid::new_v4(), &CreateJobSheet::default(), "Brochures", None)
            .await
            .unwrap();
        (machine, job)
    }

    fn move_to(job: &JobSheet, machine: &Machine, status: JobStatus) -> JobStatusUpdate {
        JobStatusUpdate {
            job_id: Some(job.id),
            machine_id: Some(machine.id),
            status: Some(status),
            operator_notes: None,
        }
    }

    #[test]
    fn transition_table() {
        use JobStatus::*;
        assert!(can_transition(Pending, Assigned));
        assert!(can_transition(Assigned, InProgress));
        assert!(can_transition(InProgress, Completed));
        for from in [Pending, Assigned, InProgress] {
            assert!(can_transition(from, Cancelled));
        }
        assert!(!can_transition(Pending, InProgress));
        assert!(!can_transition(Assigned, Assigned));
        assert!(!can_transition(Completed, Cancelled));
        assert!(!can_transition(Cancelled, Pending));
    }

    #[tokio::test]
    async fn full_lifecycle_notifies_machine() {
        let (db, _dir) = test_db().await;
        let (machine, job) = seed(&db.pool).await;

        let assigned = JobAssignmentService::assign(&db.pool, job.id, machine.id).await.unwrap();
        assert_eq!(assigned.job_status, JobStatus::Assigned);
        assert!(assigned.assigned_at.is_some());

        let running = JobAssignmentService::update_status(
            &db.pool,
            &JobStatusUpdate {
                operator_notes: Some("cyan plate re-made".into()),
                ..move_to(&job, &machine, JobStatus::InProgress)
            },
        )
        .await
        .unwrap();
        assert!(running.started_at.is_some());
        assert_eq!(running.operator_notes.as_deref(), Some("cyan plate re-made"));

        let done = JobAssignmentService::update_status(&db.pool, &move_to(&job, &machine, JobStatus::Completed))
            .await
            .unwrap();
        assert!(done.completed_at.is_some());
        assert_eq!(done.started_at, running.started_at);

        let notes = OperatorNotification::find_by_machine(&db.pool, machine.id, false, 50)
            .await
            .unwrap();
        assert_eq!(notes.len(), 3);

        let queue = JobAssignmentService::jobs_for_machine(&db.pool, machine.id, Some(JobStatus::Completed))
            .await
            .unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn illegal_moves_are_rejected() {
        let (db, _dir) = test_db().await;
        let (machine, job) = seed(&db.pool).await;
        JobAssignmentService::assign(&db.pool, job.id, machine.id).await.unwrap();

        let err = JobAssignmentService::update_status(&db.pool, &move_to(&job, &machine, JobStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, JobAssignmentError::InvalidTransition { .. }));

        let err = JobAssignmentService::assign(&db.pool, job.id, machine.id).await.unwrap_err();
        assert!(matches!(err, JobAssignmentError::InvalidTransition { .. }));

        let anonymous = JobStatusUpdate {
            machine_id: None,
            ..move_to(&job, &machine, JobStatus::InProgress)
        };
        let err = JobAssignmentService::update_status(&db.pool, &anonymous)
            .await
            .unwrap_err();
        assert!(matches!(err, JobAssignmentError::Validation(_)));
        let unchanged = JobSheet::find_by_id(&db.pool, job.id).await.unwrap().unwrap();
        assert_eq!(unchanged.job_status, JobStatus::Assigned);
        assert!(unchanged.started_at.is_none());

        let other = Machine::create(&db.pool, Uuid::new_v4(), "Ryobi", 2, &CreateMachine::default())
            .await
            .unwrap();
        let err = JobAssignmentService::update_status(&db.pool, &move_to(&job, &other, JobStatus::InProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, JobAssignmentError::WrongMachine));

        JobAssignmentService::update_status(&db.pool, &move_to(&job, &machine, JobStatus::Cancelled))
            .await
            .unwrap();
        let err = JobAssignmentService::update_status(&db.pool, &move_to(&job, &machine, JobStatus::InProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, JobAssignmentError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn offline_machines_take_no_jobs() {
        let (db, _dir) = test_db().await;
        let offline = Machine::create(
            &db.pool,
            Uuid::new_v4(),
            "Old Dominant",
            1,
            &CreateMachine {
                status: Some(MachineStatus::Offline),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let (_, job) = seed(&db.pool).await;

        let err = JobAssignmentService::assign(&db.pool, job.id, offline.id).await.unwrap_err();
        assert!(matches!(err, JobAssignmentError::Validation(_)));
        let err = JobAssignmentService::assign(&db.pool, job.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, JobAssignmentError::MachineNotFound));
    }
}
