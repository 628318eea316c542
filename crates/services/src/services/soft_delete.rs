//! Shared guard for the `active -> deleted` transition used by ledger rows,
//! job sheets and stock movements.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utils::text::non_blank_str;

/// Identity recorded when the caller does not say who deleted a row.
pub const DEFAULT_ACTOR: &str = "Admin";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SoftDeleteError {
    #[error("deletion_reason is required")]
    MissingReason,
    #[error("{0} is already deleted")]
    AlreadyDeleted(&'static str),
}

/// Body of every `PATCH .../soft-delete` endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct SoftDeleteRequest {
    pub deletion_reason: Option<String>,
    pub deleted_by: Option<String>,
}

/// A request that passed validation: trimmed reason and a resolved actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion<'a> {
    pub reason: &'a str,
    pub deleted_by: &'a str,
}

impl SoftDeleteRequest {
    pub fn validate(&self) -> Result<Deletion<'_>, SoftDeleteError> {
        let reason = non_blank_str(self.deletion_reason.as_deref())
            .ok_or(SoftDeleteError::MissingReason)?;
        let deleted_by = non_blank_str(self.deleted_by.as_deref()).unwrap_or(DEFAULT_ACTOR);
        Ok(Deletion { reason, deleted_by })
    }
}

/// Reject the transition when the row is already in the terminal state.
pub fn ensure_active(is_deleted: bool, entity: &'static str) -> Result<(), SoftDeleteError> {
    if is_deleted {
        Err(SoftDeleteError::AlreadyDeleted(entity))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_reason_is_rejected() {
        let request = SoftDeleteRequest {
            deletion_reason: Some("   ".to_string()),
            deleted_by: None,
        };
        assert_eq!(request.validate(), Err(SoftDeleteError::MissingReason));
        assert_eq!(SoftDeleteRequest::default().validate(), Err(SoftDeleteError::MissingReason));
    }

    #[test]
    fn actor_defaults_when_missing() {
        let request = SoftDeleteRequest {
            deletion_reason: Some(" wrong party ".to_string()),
            deleted_by: None,
        };
        assert_eq!(
            request.validate().unwrap(),
            Deletion {
                reason: "wrong party",
                deleted_by: DEFAULT_ACTOR
            }
        );
    }

    #[test]
    fn deleted_rows_cannot_be_deleted_again() {
        assert!(ensure_active(false, "transaction").is_ok());
        assert_eq!(
            ensure_active(true, "transaction").unwrap_err().to_string(),
            "transaction is already deleted"
        );
    }
}
