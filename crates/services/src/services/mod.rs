pub mod config;
pub mod database_validator;
pub mod email_worker;
pub mod identity_admin;
pub mod inventory;
pub mod job_assignment;
pub mod job_sheets;
pub mod ledger;
pub mod machines;
pub mod mail_api;
pub mod notifications;
pub mod paper_types;
pub mod parties;
pub mod quotations;
pub mod rate_limiter;
pub mod soft_delete;
pub mod user_setup;
