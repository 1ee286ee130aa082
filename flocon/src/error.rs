use std::{io, path::PathBuf};

use qbo::{QboError, QuickBooksBuilderError};
use thiserror::Error;
use url::ParseError;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum FloconError {
    #[error("Unable to load the application configuration file {path:?}")]
    ApplicationConfig { path: PathBuf, source: io::Error },
    #[error("Unable to parse contents of {path}")]
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Unable to create configuration file {path}")]
    ConfigFileCreation { path: PathBuf },
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("{0}")]
    Qbo(String),
    #[error("Not connected to QuickBooks. Please authorize first.")]
    NotConnected,
    #[error("Payroll access not authorized. Please reconnect QuickBooks with Payroll permissions.")]
    PayrollNotAuthorized,
    #[error("{0}")]
    NotFound(String),
    /// A record is not in a state that allows it to be synced
    #[error("{0}")]
    Sync(String),
    #[error("Database request failed: {0}")]
    Database(String),
    #[error("SQL dbms error: {0}")]
    Sql(String),
    #[error("Migration {filename} failed: {reason}")]
    Migration { filename: String, reason: String },
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Directory creation failed")]
    CreateDir(#[from] io::Error),
    #[error("Could not make sense of input: {0}")]
    BadInput(String),
    #[error("Unable to parse the url: {0}")]
    InvalidUrl(ParseError),
    #[error("Mutex locking error")]
    LockPoisoned,
}

impl From<QboError> for FloconError {
    fn from(err: QboError) -> Self {
        FloconError::Qbo(format!("{err}"))
    }
}

impl From<QuickBooksBuilderError> for FloconError {
    fn from(err: QuickBooksBuilderError) -> Self {
        FloconError::Qbo(format!("{err}"))
    }
}

impl From<csv::Error> for FloconError {
    fn from(err: csv::Error) -> Self {
        FloconError::BadInput(format!("{err}"))
    }
}

impl From<rusqlite::Error> for FloconError {
    fn from(err: rusqlite::Error) -> Self {
        FloconError::Sql(format!("Sqlite error {err}"))
    }
}

impl From<reqwest::Error> for FloconError {
    fn from(err: reqwest::Error) -> Self {
        FloconError::Database(format!("{err}"))
    }
}

impl From<serde_json::Error> for FloconError {
    fn from(err: serde_json::Error) -> Self {
        FloconError::Database(format!("Unexpected response: {err}"))
    }
}

impl From<ParseError> for FloconError {
    fn from(value: ParseError) -> Self {
        FloconError::InvalidUrl(value)
    }
}
