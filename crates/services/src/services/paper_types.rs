use db::models::paper_type::{CreatePaperType, PaperType};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use utils::text::non_blank_str;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PaperTypeError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Validation(String),
    #[error("a paper type named '{0}' already exists")]
    DuplicateName(String),
}

pub struct PaperTypeService;

impl PaperTypeService {
    pub async fn list(pool: &SqlitePool) -> Result<Vec<PaperType>, PaperTypeError> {
        Ok(PaperType::find_all(pool).await?)
    }

    pub async fn create(pool: &SqlitePool, data: &CreatePaperType) -> Result<PaperType, PaperTypeError> {
        let name = non_blank_str(data.name.as_deref())
            .ok_or_else(|| PaperTypeError::Validation("name is required".into()))?;
        if data.gsm.is_some_and(|gsm| gsm <= 0) {
            return Err(PaperTypeError::Validation("gsm must be greater than zero".into()));
        }
        if PaperType::find_by_name(pool, name).await?.is_some() {
            return Err(PaperTypeError::DuplicateName(name.to_string()));
        }

        let paper = PaperType::create(pool, Uuid::new_v4(), name, data.gsm).await?;
        info!(paper_type_id = %paper.id, name = %paper.name, "paper type created");
        Ok(paper)
    }
}
