use std::fs::File;
use std::process::exit;

use log::debug;

use flocon::error::FloconError;
use flocon::service::vendor_import::read_vendors;
use flocon::types::{BatchResult, ImportOutcome, ProjectSummary, ProjectSyncResult, SyncResult};

use crate::cli::SyncCommand;
use crate::get_runtime;

pub async fn execute(cmd: SyncCommand) -> Result<(), FloconError> {
    let runtime = get_runtime();
    let projects = runtime.engagement_sync();
    let invoices = runtime.invoice_sync();

    match cmd {
        SyncCommand::Project { engagement_id, create } => {
            let result = projects.sync_engagement(&engagement_id, create).await;
            print_sync_result(&engagement_id, &result);
            if !result.success {
                exit(4);
            }
        }
        SyncCommand::Projects { engagement_ids } => {
            let outcome = projects.sync_multiple(&engagement_ids).await;
            for (id, result) in engagement_ids.iter().zip(&outcome.results) {
                print_sync_result(id, result);
            }
            println!(
                "\nSynced {} of {} projects",
                outcome.success,
                engagement_ids.len()
            );
        }
        SyncCommand::All { only_unsynced } => {
            let batch = projects.sync_all_projects(only_unsynced).await?;
            print_project_batch(&batch);
        }
        SyncCommand::Clear { yes } => {
            if !yes {
                eprintln!("This clears the QuickBooks link of every project. Re-run with --yes to proceed");
                exit(4);
            }
            let batch = projects.clear_and_resync().await?;
            print_project_batch(&batch);
        }
        SyncCommand::Invoice { pay_app_id } => {
            let result = invoices.sync_pay_app(&pay_app_id).await;
            match (result.success, result.invoice_id, result.error) {
                (true, Some(invoice_id), _) => println!("Pay app {pay_app_id} synced as invoice {invoice_id}"),
                (_, _, error) => {
                    eprintln!("Pay app {pay_app_id} failed: {}", error.unwrap_or_default());
                    exit(4);
                }
            }
        }
        SyncCommand::Billing { project_id } => {
            let batch = invoices.sync_billing(&project_id).await?;
            if batch.total_count == 0 {
                println!("No pay apps to sync");
                return Ok(());
            }
            for item in &batch.results {
                match &item.result.invoice_id {
                    Some(invoice_id) if item.result.success => {
                        println!("{:36} invoice {invoice_id}", item.pay_app_id);
                    }
                    _ => println!(
                        "{:36} FAILED {}",
                        item.pay_app_id,
                        item.result.error.as_deref().unwrap_or_default()
                    ),
                }
            }
            println!(
                "\n{} synced, {} failed of {} pay apps",
                batch.synced_count, batch.error_count, batch.total_count
            );
        }
        SyncCommand::LinkInvoices { engagement_id } => {
            let result = invoices.link_existing_invoices(&engagement_id).await?;
            debug!("Link result {result:?}");
            if let Some(message) = &result.message {
                println!("{message}");
            }
            for m in &result.matches {
                println!(
                    "Pay app #{} -> invoice {} ({:?})",
                    m.pay_app_number, m.invoice_doc_number, m.match_type
                );
            }
            for unmatched in &result.unmatched {
                println!(
                    "Pay app #{} ({:.2}) has no matching invoice",
                    unmatched.pay_app_number, unmatched.amount
                );
            }
            for error in &result.errors {
                eprintln!("Pay app {} not linked: {}", error.pay_app_id, error.error);
            }
            println!("\nLinked {} of {} pay apps", result.matched, result.total);
        }
        SyncCommand::Vendors { file } => {
            let rdr = File::open(&file).map_err(|e| FloconError::Io(format!("{}: {e}", file.display())))?;
            let vendors = read_vendors(rdr)?;
            if vendors.is_empty() {
                println!("No vendors in {}", file.display());
                return Ok(());
            }
            let result = runtime.vendor_import().import(&vendors).await?;
            for vendor in &result.results {
                match vendor.outcome {
                    ImportOutcome::Created => {
                        println!("{:40} created {}", vendor.name, vendor.qbo_id.as_deref().unwrap_or_default());
                    }
                    ImportOutcome::Duplicate => println!("{:40} already exists", vendor.name),
                    ImportOutcome::Failed => println!(
                        "{:40} FAILED {}",
                        vendor.name,
                        vendor.error.as_deref().unwrap_or_default()
                    ),
                }
            }
            println!(
                "\n{} created, {} skipped, {} errors of {} vendors ({} project vendors)",
                result.created, result.skipped, result.errors, result.total, result.project_vendors
            );
        }
        SyncCommand::BackfillCompanies => {
            let result = projects.backfill_company_qbo_ids().await?;
            for company in &result.updated {
                println!("{:40} customer {}", company.name, company.qbo_id);
            }
            for error in &result.errors {
                eprintln!("{error}");
            }
            println!(
                "\n{} updated, {} already linked, {} skipped",
                result.updated.len(),
                result.already_linked,
                result.skipped
            );
        }
        SyncCommand::SetJob { project_number, job_id } => {
            let count = projects.set_job_id(&project_number, &job_id).await?;
            println!("Project {project_number} linked to job {job_id} ({count} engagements)");
        }
        SyncCommand::Status => {
            let report = projects.status_report().await?;
            println!(
                "{} projects, {} synced, {} not synced",
                report.total, report.synced, report.unsynced
            );
            if !report.unsynced_projects.is_empty() {
                println!("\nNot synced:");
                for project in &report.unsynced_projects {
                    print_project(project);
                }
            }
            if !report.recently_synced.is_empty() {
                println!("\nRecently synced:");
                for project in &report.recently_synced {
                    print_project(project);
                }
            }
        }
    }
    Ok(())
}

fn print_sync_result(id: &str, result: &SyncResult) {
    if result.success {
        println!(
            "{id:36} customer {} job {}",
            result.customer_id.as_deref().unwrap_or("-"),
            result.job_id.as_deref().unwrap_or("-")
        );
    } else {
        println!("{id:36} FAILED {}", result.error.as_deref().unwrap_or_default());
    }
}

fn print_project_batch(batch: &BatchResult<ProjectSyncResult>) {
    if batch.total_count == 0 {
        println!("No projects to sync");
        return;
    }
    for item in &batch.results {
        let label = format!(
            "{} {}",
            item.project_number.as_deref().unwrap_or("-"),
            item.name
        );
        print_sync_result(&label, &item.result);
    }
    println!(
        "\n{} synced, {} failed of {} projects",
        batch.synced_count, batch.error_count, batch.total_count
    );
}

fn print_project(project: &ProjectSummary) {
    println!(
        "  {:8} {:40} {}",
        project.project_number.as_deref().unwrap_or("-"),
        project.name,
        project
            .qbo_last_synced_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    );
}
