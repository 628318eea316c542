use db::models::party::{CreateParty, Party, UpdateParty};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use utils::text::non_blank_str;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PartyError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("party not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
    #[error("party has {0} active ledger entries, job sheets or stock rows and cannot be deleted")]
    HasDependents(i64),
}

fn validate_credit_limit(credit_limit: Option<f64>) -> Result<(), PartyError> {
    match credit_limit {
        Some(limit) if !limit.is_finite() || limit < 0.0 => Err(PartyError::Validation(
            "credit_limit must be a non-negative number".into(),
        )),
        _ => Ok(()),
    }
}

pub struct PartyService;

impl PartyService {
    pub async fn list(pool: &SqlitePool, search: Option<&str>) -> Result<Vec<Party>, PartyError> {
        Ok(Party::find_all(pool, non_blank_str(search)).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Party, PartyError> {
        Party::find_by_id(pool, id).await?.ok_or(PartyError::NotFound)
    }

    pub async fn create(pool: &SqlitePool, data: &CreateParty) -> Result<Party, PartyError> {
        let name = non_blank_str(data.name.as_deref())
            .ok_or_else(|| PartyError::Validation("name is required".into()))?;
        validate_credit_limit(data.credit_limit)?;

        let party = Party::create(pool, Uuid::new_v4(), name, data).await?;
        info!(party_id = %party.id, name = %party.name, "party created");
        Ok(party)
    }

    pub async fn update(pool: &SqlitePool, id: Uuid, data: &UpdateParty) -> Result<Party, PartyError> {
        if data.name.is_some() && non_blank_str(data.name.as_deref()).is_none() {
            return Err(PartyError::Validation("name cannot be blank".into()));
        }
        validate_credit_limit(data.credit_limit)?;

        let data = UpdateParty {
            name: data.name.as_deref().map(|n| n.trim().to_string()),
            ..data.clone()
        };
        Party::update(pool, id, &data).await?.ok_or(PartyError::NotFound)
    }

    /// Parties are only removable once nothing live points at them.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), PartyError> {
        let party = Self::get(pool, id).await?;
        let dependents = Party::count_dependents(pool, id).await?;
        if dependents > 0 {
            return Err(PartyError::HasDependents(dependents));
        }
        Party::delete(pool, id).await?;
        info!(party_id = %id, name = %party.name, "party deleted");
        Ok(())
    }
}
