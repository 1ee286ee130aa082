use flocon::error::FloconError;

use crate::cli::MigrateCommand;
use crate::get_runtime;

pub async fn execute(cmd: MigrateCommand) -> Result<(), FloconError> {
    let runtime = get_runtime();

    match cmd {
        MigrateCommand::Run { dir } => {
            println!("Running migrations in {}", dir.display());
            let run = runtime.migrations().run(&dir).await?;
            for filename in &run.executed {
                println!("  executed {filename}");
            }
            if run.is_up_to_date() {
                println!("Database is up to date ({} migrations)", run.found);
            } else {
                println!(
                    "{} executed, {} already applied",
                    run.executed.len(),
                    run.already_executed.len()
                );
            }
        }
        MigrateCommand::Status => {
            let executed = runtime.migrations().status().await?;
            if executed.is_empty() {
                println!("No migrations executed");
            }
            for migration in executed {
                println!(
                    "{:60} {}",
                    migration.filename,
                    migration.executed_at.unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}
