use std::process::exit;

use flocon::error::FloconError;
use flocon::service::cost_report::DateRange;
use flocon::types::LedgerPayroll;

use crate::cli::{CostsCommand, JobPeriod};
use crate::get_runtime;

fn range(period: &JobPeriod) -> DateRange {
    DateRange::new(period.start, period.end)
}

pub async fn execute(cmd: CostsCommand) -> Result<(), FloconError> {
    let runtime = get_runtime();
    let reports = runtime.cost_reports();

    match cmd {
        CostsCommand::Project(period) => {
            let dates = range(&period);
            let costs = reports.project_costs(&period.job_id, dates).await?;
            println!("Job {} from {} to {}", period.job_id, dates.start, dates.end);
            println!("  {:20} {:>12.2}", "Bills", costs.bills_total);
            println!("  {:20} {:>12.2}", "Purchases", costs.purchases_total);
            println!("  {:20} {:>12.2}", "Journal entries", costs.journal_entries_total);
            println!("  {:20} {:>12.2}", "Time", costs.time_activity_total);
            println!("  {:20} {:>12.2}", "Payroll", costs.payroll_total);
            println!("  {:20} {:>12.2}", "Vendor credits", -costs.credits_total);
            println!("  {:20} {:>12.2}", "Net cost to date", costs.net_cost_to_date);
            println!("\n{} transactions", costs.transaction_count);
        }
        CostsCommand::Cached {
            engagement_id,
            job_id,
            force,
        } => {
            let costs = reports.cached_project_costs(&engagement_id, &job_id, force).await?;
            let source = if costs.cached { "cache" } else { "QuickBooks" };
            println!(
                "Net cost to date {:.2} ({} payroll checks) from {source}, synced {}",
                costs.net_cost_to_date,
                costs.credits_count,
                costs
                    .last_synced
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default()
            );
        }
        CostsCommand::Payroll(period) => match reports.payroll_costs(&period.job_id, range(&period)).await {
            Ok(costs) => println!(
                "Payroll {:.2} from {} paychecks",
                costs.payroll_total, costs.paycheck_count
            ),
            Err(FloconError::PayrollNotAuthorized) => {
                eprintln!("{}", FloconError::PayrollNotAuthorized);
                eprintln!("Try 'flocon costs payroll-gl {}' instead", period.job_id);
                exit(4);
            }
            Err(e) => return Err(e),
        },
        CostsCommand::PayrollGl(period) => {
            let payroll = reports.payroll_from_ledger(&period.job_id, range(&period)).await?;
            print_ledger_payroll(&payroll);
        }
        CostsCommand::PayrollGlCash(period) => {
            let costs = reports.cash_costs(&period.job_id, range(&period)).await?;
            print_ledger_payroll(&costs);
        }
        CostsCommand::ProfitLoss(period) => {
            let summary = reports.profit_loss(&period.job_id, range(&period)).await?;
            println!("  {:20} {:>12.2}", "Income", summary.income);
            println!("  {:20} {:>12.2}", "Cost of goods sold", summary.cogs);
            println!("  {:20} {:>12.2}", "Expenses", summary.expenses);
            println!("  {:20} {:>12.2}", "Net income", summary.net_income);
            if !summary.expense_accounts.is_empty() {
                println!("\nExpense accounts:");
                for account in &summary.expense_accounts {
                    println!("  {account}");
                }
            }
        }
    }
    Ok(())
}

fn print_ledger_payroll(payroll: &LedgerPayroll) {
    for account in &payroll.accounts_checked {
        println!("  {account}");
    }
    println!(
        "\n{:.2} in {} transactions ({})",
        payroll.payroll_total, payroll.transactions_found, payroll.method
    );
}
