use std::process::exit;

use flocon::error::FloconError;
use flocon::types::PullResult;

use crate::cli::PullCommand;
use crate::get_runtime;

pub async fn execute(cmd: PullCommand) -> Result<(), FloconError> {
    let runtime = get_runtime();
    let parties = runtime.party_pull();

    let result = match cmd {
        PullCommand::Vendors => parties.pull_vendors().await,
        PullCommand::Customers => parties.pull_customers().await,
        PullCommand::Subcontractors => parties.pull_subcontractors().await,
        PullCommand::Payment { pay_app_id } => {
            let payment = runtime.invoice_sync().pull_payment(&pay_app_id).await;
            match (payment.success, payment.payment_total, payment.error) {
                (true, Some(total), _) => println!("Pay app {pay_app_id}: {total:.2} paid"),
                (_, _, error) => {
                    eprintln!("Pay app {pay_app_id}: {}", error.unwrap_or_default());
                    exit(4);
                }
            }
            return Ok(());
        }
    };
    print_pull_result(&result);
    Ok(())
}

fn print_pull_result(result: &PullResult) {
    if let Some(error) = &result.error {
        eprintln!("ERROR: {error}");
        exit(4);
    }
    for party in &result.vendors {
        println!("{:8} {:40} {}", format!("{:?}", party.action), party.name, party.qbo_id);
    }
    println!(
        "\n{} created, {} updated, {} skipped of {}",
        result.created, result.updated, result.skipped, result.total
    );
}
