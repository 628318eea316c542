use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{
    database_validator::DatabaseValidationError, email_worker::EmailWorkerError,
    inventory::InventoryError, job_assignment::JobAssignmentError, job_sheets::JobSheetError,
    ledger::LedgerError, machines::MachineError, notifications::NotificationError,
    paper_types::PaperTypeError, parties::PartyError, quotations::QuotationError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Party(#[from] PartyError),
    #[error(transparent)]
    JobSheet(#[from] JobSheetError),
    #[error(transparent)]
    JobAssignment(#[from] JobAssignmentError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Machine(#[from] MachineError),
    #[error(transparent)]
    PaperType(#[from] PaperTypeError),
    #[error(transparent)]
    Quotation(#[from] QuotationError),
    #[error(transparent)]
    EmailWorker(#[from] EmailWorkerError),
    #[error(transparent)]
    DatabaseValidation(#[from] DatabaseValidationError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("too many requests, try again later")]
    TooManyRequests,
    #[error("{0}")]
    Unavailable(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(format!("invalid query: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(format!("invalid path: {}", rejection.body_text()))
    }
}

fn ledger_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        LedgerError::PartyNotFound | LedgerError::TransactionNotFound => StatusCode::NOT_FOUND,
        LedgerError::Validation(_) | LedgerError::SoftDelete(_) => StatusCode::BAD_REQUEST,
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Ledger(err) => ledger_status(err),
            ApiError::Party(err) => match err {
                PartyError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PartyError::NotFound => StatusCode::NOT_FOUND,
                PartyError::Validation(_) | PartyError::HasDependents(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::JobSheet(err) => match err {
                JobSheetError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                JobSheetError::NotFound | JobSheetError::PartyNotFound => StatusCode::NOT_FOUND,
                JobSheetError::Validation(_) | JobSheetError::SoftDelete(_) => StatusCode::BAD_REQUEST,
                JobSheetError::Ledger(inner) => ledger_status(inner),
            },
            ApiError::JobAssignment(err) => match err {
                JobAssignmentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                JobAssignmentError::JobNotFound | JobAssignmentError::MachineNotFound => {
                    StatusCode::NOT_FOUND
                }
                JobAssignmentError::WrongMachine
                | JobAssignmentError::InvalidTransition { .. }
                | JobAssignmentError::Validation(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::Notification(err) => match err {
                NotificationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                NotificationError::MachineNotFound | NotificationError::NotFound => {
                    StatusCode::NOT_FOUND
                }
            },
            ApiError::Inventory(err) => match err {
                InventoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                InventoryError::PartyNotFound
                | InventoryError::ItemNotFound
                | InventoryError::TransactionNotFound => StatusCode::NOT_FOUND,
                InventoryError::Validation(_)
                | InventoryError::InsufficientStock { .. }
                | InventoryError::SoftDelete(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::Machine(err) => match err {
                MachineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                MachineError::NotFound => StatusCode::NOT_FOUND,
                MachineError::Validation(_)
                | MachineError::DuplicateName(_)
                | MachineError::HasActiveJobs(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::PaperType(err) => match err {
                PaperTypeError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                PaperTypeError::Validation(_) | PaperTypeError::DuplicateName(_) => {
                    StatusCode::BAD_REQUEST
                }
            },
            ApiError::Quotation(err) => match err {
                QuotationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                QuotationError::NotFound => StatusCode::NOT_FOUND,
                QuotationError::Validation(_) => StatusCode::BAD_REQUEST,
            },
            ApiError::EmailWorker(_) | ApiError::DatabaseValidation(_) | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, status = status.as_u16(), "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, ResponseJson(ApiResponse::<()>::error(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use services::services::soft_delete::SoftDeleteError;

    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::from(LedgerError::PartyNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(LedgerError::SoftDelete(SoftDeleteError::AlreadyDeleted("transaction")))
                .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(JobSheetError::Ledger(LedgerError::TransactionNotFound)).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(MachineError::DuplicateName("Komori".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(sqlx::Error::PoolTimedOut).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
