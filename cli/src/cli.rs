use std::fmt::{self, Formatter};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub(crate) enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[derive(Parser)]
/// FloCon admin utility - sync projects, invoices and vendors with QuickBooks Online
///
/// Settings are read from the configuration file and may be overridden with the
/// `SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY` and `QBO_*` environment variables.
#[command(author, version, about)] // Read from Cargo.toml
pub(crate) struct Opts {
    #[command(subcommand)]
    pub cmd: Command,

    #[arg(global = true, short, long)]
    pub verbosity: Option<LogLevel>,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Subcommands for configuration
    Config(Config),
    /// Connection to QuickBooks Online
    Qbo(Qbo),
    /// Push projects and invoices to QuickBooks
    Sync(Synchronisation),
    /// Pull vendors, customers and payments from QuickBooks
    Pull(Pull),
    /// Job cost and profit reports from QuickBooks
    Costs(Costs),
    /// Database migrations
    Migrate(Migrate),
}

#[derive(Args)]
pub(crate) struct Config {
    #[command(subcommand)]
    pub cmd: ConfigCommand,
}

/// Create, modify or list the configuration file.
#[derive(Subcommand, Clone)]
pub(crate) enum ConfigCommand {
    /// Update the configuration file, creating it if needed
    Update(UpdateConfiguration),
    /// write current configuration to standard output
    List,
    /// Remove the current configuration
    Remove,
}

#[derive(Args, Clone, Default)]
pub(crate) struct UpdateConfiguration {
    /// Base URL of the Supabase project, i.e. <https://xyz.supabase.co>
    #[arg(long)]
    pub database_url: Option<String>,
    #[arg(long)]
    pub service_role_key: Option<String>,
    /// Use a local Sqlite file rather than the hosted database
    #[arg(long)]
    pub sqlite_path: Option<String>,
    #[arg(long)]
    pub client_id: Option<String>,
    #[arg(long)]
    pub client_secret: Option<String>,
    #[arg(long)]
    pub redirect_uri: Option<String>,
    /// `sandbox` or `production`
    #[arg(long)]
    pub environment: Option<String>,
    /// Address the API server listens on
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args)]
pub(crate) struct Qbo {
    #[command(subcommand)]
    pub cmd: QboCommand,
}

#[derive(Subcommand)]
pub(crate) enum QboCommand {
    /// Shows whether a QuickBooks company is connected
    Status,
    /// Prints the authorization URL, or completes the authorization with the code
    /// Intuit redirected to
    Connect(Connect),
    /// Refreshes the access token
    Refresh,
    /// Revokes the tokens and forgets the connection
    Disconnect,
    /// Runs a QuickBooks query, i.e. "SELECT * FROM Customer MAXRESULTS 5"
    Query { query: String },
}

#[derive(Args)]
pub(crate) struct Connect {
    #[arg(long, requires = "realm_id")]
    pub code: Option<String>,
    #[arg(long, requires = "code")]
    pub realm_id: Option<String>,
}

#[derive(Args)]
pub(crate) struct Synchronisation {
    #[command(subcommand)]
    pub cmd: SyncCommand,
}

#[derive(Subcommand)]
pub(crate) enum SyncCommand {
    /// Sync one engagement to a customer and job
    Project {
        engagement_id: String,
        /// Create the customer if the contractor has no QuickBooks customer
        #[arg(short, long)]
        create: bool,
    },
    /// Sync several engagements
    Projects {
        #[arg(required = true, num_args(1..))]
        engagement_ids: Vec<String>,
    },
    /// Sync every project
    All {
        /// Only projects without a QuickBooks job
        #[arg(short, long)]
        only_unsynced: bool,
    },
    /// Push one pay app as an invoice
    Invoice { pay_app_id: String },
    /// Push every pay app of a project as invoices
    Billing { project_id: String },
    /// Link pay apps to invoices already in QuickBooks
    LinkInvoices { engagement_id: String },
    /// Summary of synced and unsynced projects
    Status,
    /// Clears every project's QuickBooks link and syncs all projects again
    Clear {
        /// Confirms the links may be cleared
        #[arg(long)]
        yes: bool,
    },
    /// Creates the vendors of a CSV export in QuickBooks.
    /// The name is read from the first column, `TRUE` in the third marks a project vendor
    Vendors { file: PathBuf },
    /// Links companies to the QuickBooks customer of their synced engagements
    BackfillCompanies,
    /// Sets the QuickBooks job of the engagement with the given project number
    SetJob { project_number: String, job_id: String },
}

#[derive(Args)]
pub(crate) struct Costs {
    #[command(subcommand)]
    pub cmd: CostsCommand,
}

#[derive(Args, Clone)]
pub(crate) struct JobPeriod {
    /// QuickBooks id of the job
    pub job_id: String,
    /// First day, i.e. 2024-01-01
    #[arg(long)]
    pub start: Option<NaiveDate>,
    /// Last day, defaults to the end of time
    #[arg(long)]
    pub end: Option<NaiveDate>,
}

#[derive(Subcommand)]
pub(crate) enum CostsCommand {
    /// Bills, purchases, journal entries, time and payroll charged to a job
    Project(JobPeriod),
    /// Job costs from the cost cache, refreshed when older than an hour
    Cached {
        engagement_id: String,
        job_id: String,
        /// Ignore the cache
        #[arg(short, long)]
        force: bool,
    },
    /// Paycheck earnings charged to a job, needs the payroll scope
    Payroll(JobPeriod),
    /// Payroll checks charged to a job, read from the ledger reports
    PayrollGl(JobPeriod),
    /// Costs of a job from its cash basis profit and loss
    PayrollGlCash(JobPeriod),
    /// Cash basis profit and loss of a job
    ProfitLoss(JobPeriod),
}

#[derive(Args)]
pub(crate) struct Pull {
    #[command(subcommand)]
    pub cmd: PullCommand,
}

#[derive(Subcommand)]
pub(crate) enum PullCommand {
    Vendors,
    /// Top level customers, jobs are ignored
    Customers,
    /// Vendors tracked for 1099
    Subcontractors,
    /// Payment status of the invoice of a pay app
    Payment { pay_app_id: String },
}

#[derive(Args)]
pub(crate) struct Migrate {
    #[command(subcommand)]
    pub cmd: MigrateCommand,
}

#[derive(Subcommand)]
pub(crate) enum MigrateCommand {
    /// Executes the pending migration scripts
    Run {
        #[arg(short, long, default_value = "supabase/migrations")]
        dir: PathBuf,
    },
    /// Lists the executed migrations
    Status,
}
