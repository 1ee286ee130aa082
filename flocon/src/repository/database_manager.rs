use crate::config::{DatabaseBackend, DatabaseConfiguration};
use crate::error::FloconError;
use crate::repository::company_repository::CompanyRepository;
use crate::repository::cost_cache_repository::CostCacheRepository;
use crate::repository::engagement_repository::EngagementRepository;
use crate::repository::migration_repository::MigrationRepository;
use crate::repository::pay_app_repository::PayAppRepository;
use crate::repository::postgrest::postgrest_company_repo::PostgrestCompanyRepository;
use crate::repository::postgrest::postgrest_cost_cache_repo::PostgrestCostCacheRepository;
use crate::repository::postgrest::postgrest_engagement_repo::PostgrestEngagementRepository;
use crate::repository::postgrest::postgrest_migration_repo::PostgrestMigrationRepository;
use crate::repository::postgrest::postgrest_pay_app_repo::PostgrestPayAppRepository;
use crate::repository::postgrest::postgrest_token_repo::PostgrestTokenRepository;
use crate::repository::postgrest::PostgrestClient;
use crate::repository::sqlite;
use crate::repository::sqlite::sqlite_company_repo::SqliteCompanyRepository;
use crate::repository::sqlite::sqlite_cost_cache_repo::SqliteCostCacheRepository;
use crate::repository::sqlite::sqlite_engagement_repo::SqliteEngagementRepository;
use crate::repository::sqlite::sqlite_migration_repo::SqliteMigrationRepository;
use crate::repository::sqlite::sqlite_pay_app_repo::SqlitePayAppRepository;
use crate::repository::sqlite::sqlite_token_repo::SqliteTokenRepository;
use crate::repository::token_repository::TokenRepository;
use crate::repository::SharedSqliteConnection;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Represents parameters for initializing the database connection
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    /// The hosted Postgres database behind its PostgREST gateway
    Postgrest { url: String, key: String },

    /// SQLite database with a specific file path
    SqliteOnDisk { path: PathBuf },

    /// SQLite database that runs entirely in memory
    SqliteInMemory,
}

impl DatabaseConfig {
    /// Picks the backend named in the application configuration.
    #[must_use]
    pub fn from_configuration(cfg: &DatabaseConfiguration) -> Self {
        match cfg.backend {
            DatabaseBackend::Postgrest => DatabaseConfig::Postgrest {
                url: cfg.url.clone(),
                key: cfg.service_role_key.clone(),
            },
            DatabaseBackend::Sqlite if cfg.sqlite_path.trim().is_empty() => {
                DatabaseConfig::SqliteOnDisk {
                    path: crate::config::sqlite_file(),
                }
            }
            DatabaseBackend::Sqlite => DatabaseConfig::SqliteOnDisk {
                path: PathBuf::from(&cfg.sqlite_path),
            },
        }
    }
}

enum Backend {
    Postgrest(PostgrestClient),
    Sqlite(SharedSqliteConnection),
}

pub struct DatabaseManager {
    backend: Backend,
}

impl DatabaseManager {
    /// Creates a new `DatabaseManager` based on the provided configuration.
    ///
    /// `SQLite` databases get their schema created; the Postgres schema is
    /// owned by the migrations.
    ///
    /// # Errors
    /// Returns an error if the database can not be opened or the client not created
    pub fn new(config: &DatabaseConfig) -> Result<Self, FloconError> {
        let backend = match config {
            DatabaseConfig::Postgrest { url, key } => {
                Backend::Postgrest(PostgrestClient::new(url, key)?)
            }
            DatabaseConfig::SqliteOnDisk { path } => {
                Self::sqlite_backend(sqlite::create_connection(path)?)?
            }
            DatabaseConfig::SqliteInMemory => {
                Self::sqlite_backend(Connection::open_in_memory()?)?
            }
        };
        Ok(Self { backend })
    }

    fn sqlite_backend(connection: Connection) -> Result<Backend, FloconError> {
        let connection = Arc::new(Mutex::new(connection));
        sqlite::create_schema(&connection)?;
        Ok(Backend::Sqlite(connection))
    }

    /// Provide access to the shared `SQLite` connection, if that is the backend.
    #[cfg(test)]
    pub(crate) fn sqlite_connection(&self) -> Result<SharedSqliteConnection, FloconError> {
        match &self.backend {
            Backend::Sqlite(connection) => Ok(connection.clone()),
            Backend::Postgrest(_) => Err(FloconError::Database(
                "no SQLite connection for a PostgREST database".to_string(),
            )),
        }
    }

    pub fn create_engagement_repository(&self) -> Arc<dyn EngagementRepository> {
        match &self.backend {
            Backend::Postgrest(client) => Arc::new(PostgrestEngagementRepository::new(client.clone())),
            Backend::Sqlite(connection) => Arc::new(SqliteEngagementRepository::new(connection.clone())),
        }
    }

    pub fn create_company_repository(&self) -> Arc<dyn CompanyRepository> {
        match &self.backend {
            Backend::Postgrest(client) => Arc::new(PostgrestCompanyRepository::new(client.clone())),
            Backend::Sqlite(connection) => Arc::new(SqliteCompanyRepository::new(connection.clone())),
        }
    }

    pub fn create_pay_app_repository(&self) -> Arc<dyn PayAppRepository> {
        match &self.backend {
            Backend::Postgrest(client) => Arc::new(PostgrestPayAppRepository::new(client.clone())),
            Backend::Sqlite(connection) => Arc::new(SqlitePayAppRepository::new(connection.clone())),
        }
    }

    pub fn create_token_repository(&self) -> Arc<dyn TokenRepository> {
        match &self.backend {
            Backend::Postgrest(client) => Arc::new(PostgrestTokenRepository::new(client.clone())),
            Backend::Sqlite(connection) => Arc::new(SqliteTokenRepository::new(connection.clone())),
        }
    }

    pub fn create_cost_cache_repository(&self) -> Arc<dyn CostCacheRepository> {
        match &self.backend {
            Backend::Postgrest(client) => Arc::new(PostgrestCostCacheRepository::new(client.clone())),
            Backend::Sqlite(connection) => Arc::new(SqliteCostCacheRepository::new(connection.clone())),
        }
    }

    pub fn create_migration_repository(&self) -> Arc<dyn MigrationRepository> {
        match &self.backend {
            Backend::Postgrest(client) => Arc::new(PostgrestMigrationRepository::new(client.clone())),
            Backend::Sqlite(connection) => Arc::new(SqliteMigrationRepository::new(connection.clone())),
        }
    }
}
