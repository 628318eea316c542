pub mod dashboard;
pub mod email_notification;
pub mod inventory;
pub mod job_sheet;
pub mod machine;
pub mod operator_notification;
pub mod paper_type;
pub mod party;
pub mod party_transaction;
pub mod quotation;
