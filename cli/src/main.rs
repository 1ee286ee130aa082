//! # The FloCon admin command line utility
//!
//! Runs the QuickBooks Online sync by hand, outside of the web app.
//!
//! ## Configuration
//! ```bash
//! flocon config update --database-url https://xyz.supabase.co --service-role-key KEY \
//!     --client-id ID --client-secret SECRET --redirect-uri https://flocon.example.com/api/qbo/callback
//! ```
//!
//! ## Connecting to QuickBooks
//! ```bash
//! flocon qbo connect
//! flocon qbo connect --code CODE --realm-id 9341
//! flocon qbo status
//! ```
//!
//! ## Syncing
//! ```bash
//! flocon sync project 6f1c...      # one engagement
//! flocon sync all --only-unsynced  # every project without a job
//! flocon sync billing 6f1c...      # every pay app of a project
//! flocon pull vendors
//! flocon sync vendors vendors.csv  # create the vendors of a CSV export
//! flocon sync set-job 1290 88      # link a project to a job by hand
//! ```
//!
//! ## Job costs
//! ```bash
//! flocon costs project 88 --start 2024-01-01
//! flocon costs cached 6f1c... 88 --force
//! flocon costs profit-loss 88
//! ```
//!
//! ## Migrations
//! ```bash
//! flocon migrate run --dir supabase/migrations
//! ```
use clap::Parser;
use cli::{Command, LogLevel, Opts};
use commands::{configuration, costs, migrate, pull, qbo, sync};
use env_logger::Env;
use log::debug;
use std::env;
use std::fs::File;
use std::process::exit;

use flocon::{error::FloconError, ApplicationRuntime};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<(), FloconError> {
    let opts: Opts = Opts::parse();

    configure_logging(&opts); // Handles the -v option

    match opts.cmd {
        Command::Config(config) => configuration::execute(config.cmd),
        Command::Qbo(qbo) => qbo::execute(qbo.cmd).await?,
        Command::Sync(sync) => sync::execute(sync.cmd).await?,
        Command::Pull(pull) => pull::execute(pull.cmd).await?,
        Command::Costs(costs) => costs::execute(costs.cmd).await?,
        Command::Migrate(migrate) => migrate::execute(migrate.cmd).await?,
    }

    Ok(())
}

/// Creates the runtime from the configuration file, exiting if that is not possible
fn get_runtime() -> ApplicationRuntime {
    match ApplicationRuntime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            match err {
                FloconError::ApplicationConfig { .. } | FloconError::TomlParse { .. } => {
                    eprintln!(
                        "Unable to read the configuration file: '{err}'. Use 'flocon config update' to create it"
                    );
                }
                _ => {
                    eprintln!("Failed to create runtime: '{err}'");
                }
            }

            exit(1);
        }
    }
}

fn configure_logging(opts: &Opts) {
    let mut log_file = env::temp_dir();
    log_file.push("flocon.log");

    if opts.verbosity.is_some() {
        println!("Logging to {}", &log_file.to_string_lossy());
    }

    // If nothing else was specified in RUST_LOG, use 'warn'
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(
        opts.verbosity.map_or("warn", |lvl| match lvl {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }),
    ));
    match File::create(&log_file) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Err(e) => eprintln!("Unable to create {}, logging to stderr: {e}", log_file.display()),
    }
    builder.init();
    debug!("Logging started");
}
