use std::{env, fs, path::PathBuf};

use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`.\n// Do not edit it by hand.\n\n";
    let decls = [
        db::models::party::Party::decl(),
        db::models::party::CreateParty::decl(),
        db::models::party::UpdateParty::decl(),
        db::models::party_transaction::TransactionType::decl(),
        db::models::party_transaction::PartyTransaction::decl(),
        db::models::party_transaction::CreatePartyTransaction::decl(),
        db::models::party_transaction::UpdatePartyTransaction::decl(),
        db::models::party_transaction::TransactionFilter::decl(),
        db::models::job_sheet::JobStatus::decl(),
        db::models::job_sheet::JobSheet::decl(),
        db::models::job_sheet::CreateJobSheet::decl(),
        db::models::job_sheet::UpdateJobSheet::decl(),
        db::models::job_sheet::JobSheetFilter::decl(),
        db::models::machine::MachineStatus::decl(),
        db::models::machine::Machine::decl(),
        db::models::machine::MachineWithWorkload::decl(),
        db::models::machine::CreateMachine::decl(),
        db::models::machine::UpdateMachine::decl(),
        db::models::operator_notification::NotificationType::decl(),
        db::models::operator_notification::OperatorNotification::decl(),
        db::models::inventory::InventoryTransactionType::decl(),
        db::models::inventory::InventoryItem::decl(),
        db::models::inventory::InventoryItemDetails::decl(),
        db::models::inventory::InventoryTransaction::decl(),
        db::models::inventory::CreateInventoryTransaction::decl(),
        db::models::inventory::InventoryTransactionFilter::decl(),
        db::models::paper_type::PaperType::decl(),
        db::models::paper_type::CreatePaperType::decl(),
        db::models::quotation::QuotationStatus::decl(),
        db::models::quotation::QuotationRequest::decl(),
        db::models::quotation::CreateQuotationRequest::decl(),
        db::models::quotation::UpdateQuotationRequest::decl(),
        db::models::email_notification::EmailStatus::decl(),
        db::models::email_notification::EmailNotification::decl(),
        db::models::dashboard::DashboardStats::decl(),
        services::services::soft_delete::SoftDeleteRequest::decl(),
        services::services::job_assignment::JobStatusUpdate::decl(),
        services::services::job_assignment::AssignJob::decl(),
        services::services::notifications::NotificationFeed::decl(),
        services::services::email_worker::EmailWorkerReport::decl(),
        services::services::user_setup::SetupAction::decl(),
        services::services::user_setup::AccountSetupResult::decl(),
        services::services::database_validator::SchemaStatus::decl(),
        server::routes::auth::AdminLogin::decl(),
        server::routes::notifications::MarkNotificationRead::decl(),
        server::routes::notifications::MarkAllRead::decl(),
        server::routes::notifications::MarkAllReadResponse::decl(),
        utils::response::ApiResponse::<()>::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|d| {
            let trimmed = d.trim_start();
            if trimmed.starts_with("export") {
                trimmed.to_string()
            } else {
                format!("export {trimmed}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("{header}{body}\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared/types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&shared_path).unwrap_or_default();
        if current == generated {
            println!("shared/types.ts is up to date.");
            std::process::exit(0);
        }
        eprintln!("shared/types.ts is out of date. Run `cargo run --bin generate_types`.");
        std::process::exit(1);
    }

    if let Some(parent) = shared_path.parent()
        && let Err(err) = fs::create_dir_all(parent)
    {
        eprintln!("failed to create {}: {err}", parent.display());
        std::process::exit(1);
    }
    if let Err(err) = fs::write(&shared_path, generated) {
        eprintln!("failed to write {}: {err}", shared_path.display());
        std::process::exit(1);
    }
    println!("Wrote {}", shared_path.display());
}
