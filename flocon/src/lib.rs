//! QuickBooks Online synchronisation for the FloCon database.
//!
//! The [`ApplicationRuntime`] wires the configured database backend and the QuickBooks
//! clients into the sync services used by the HTTP API and the admin CLI.
use crate::config::AppConfiguration;
use crate::error::FloconError;
use crate::repository::database_manager::{DatabaseConfig, DatabaseManager};
use crate::repository::migration_repository::MigrationRepository;
use crate::service::cost_report::CostReportService;
use crate::service::engagement_sync::{EngagementSyncService, BULK_SYNC_DELAY};
use crate::service::invoice_sync::InvoiceSyncService;
use crate::service::migration::MigrationService;
use crate::service::party_pull::PartyPullService;
use crate::service::token::TokenService;
use crate::service::vendor_import::{VendorImportService, IMPORT_DELAY};
use log::debug;
use qbo::oauth::OAuthClient;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod repository;
pub mod service;
pub mod types;

pub struct ApplicationRuntime {
    config: AppConfiguration,
    tokens: Arc<TokenService>,
    engagement_sync: EngagementSyncService,
    invoice_sync: InvoiceSyncService,
    party_pull: PartyPullService,
    cost_reports: CostReportService,
    vendor_import: VendorImportService,
    migrations: MigrationService,
    migration_repository: Arc<dyn MigrationRepository>,
}

impl ApplicationRuntime {
    /// A runtime built from the configuration file and the environment
    ///
    /// # Errors
    /// Returns an error if the configuration can not be loaded or the database is not reachable
    pub fn new() -> Result<Self, FloconError> {
        ApplicationRuntimeBuilder::new().build()
    }

    #[must_use]
    pub fn configuration(&self) -> &AppConfiguration {
        &self.config
    }

    #[must_use]
    pub fn token_service(&self) -> &TokenService {
        &self.tokens
    }

    #[must_use]
    pub fn engagement_sync(&self) -> &EngagementSyncService {
        &self.engagement_sync
    }

    #[must_use]
    pub fn invoice_sync(&self) -> &InvoiceSyncService {
        &self.invoice_sync
    }

    #[must_use]
    pub fn party_pull(&self) -> &PartyPullService {
        &self.party_pull
    }

    #[must_use]
    pub fn cost_reports(&self) -> &CostReportService {
        &self.cost_reports
    }

    #[must_use]
    pub fn vendor_import(&self) -> &VendorImportService {
        &self.vendor_import
    }

    #[must_use]
    pub fn migrations(&self) -> &MigrationService {
        &self.migrations
    }

    /// Runs a SQL script straight against the database
    ///
    /// # Errors
    /// Returns the database error of the script
    pub async fn exec_sql(&self, sql: &str) -> Result<(), FloconError> {
        self.migration_repository.exec_sql(sql).await
    }

    /// Runs a QuickBooks query as is and returns the raw response
    ///
    /// # Errors
    /// `NotConnected` without tokens, otherwise the QuickBooks error
    pub async fn qbo_query(&self, query: &str) -> Result<Value, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        Ok(client.raw_query(query).await?)
    }
}

#[derive(Default)]
pub struct ApplicationRuntimeBuilder {
    config: Option<AppConfiguration>,
    database: Option<DatabaseConfig>,
    bulk_delay: Option<Duration>,
}

impl ApplicationRuntimeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses this configuration rather than loading the configuration file
    #[must_use]
    pub fn with_config(mut self, config: AppConfiguration) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the database named in the configuration
    #[must_use]
    pub fn with_database(mut self, database: DatabaseConfig) -> Self {
        self.database = Some(database);
        self
    }

    #[must_use]
    pub fn use_in_memory_db(self) -> Self {
        self.with_database(DatabaseConfig::SqliteInMemory)
    }

    /// Pause between the projects of a bulk sync and between imported vendors
    #[must_use]
    pub fn with_bulk_delay(mut self, delay: Duration) -> Self {
        self.bulk_delay = Some(delay);
        self
    }

    /// # Errors
    /// Returns an error if the configuration can not be loaded or the database can not be
    /// opened
    pub fn build(self) -> Result<ApplicationRuntime, FloconError> {
        let config = match self.config {
            Some(config) => config,
            None => config::load()?,
        };
        let database = self
            .database
            .unwrap_or_else(|| DatabaseConfig::from_configuration(&config.database));
        debug!("Creating runtime with database {database:?}");

        let manager = DatabaseManager::new(&database)?;
        let engagements = manager.create_engagement_repository();
        let companies = manager.create_company_repository();
        let pay_apps = manager.create_pay_app_repository();
        let migration_repository = manager.create_migration_repository();

        let tokens = Arc::new(TokenService::new(
            manager.create_token_repository(),
            OAuthClient::new(config.qbo.clone()),
        ));
        let engagement_sync = EngagementSyncService::new(engagements.clone(), companies.clone(), tokens.clone())
            .with_bulk_delay(self.bulk_delay.unwrap_or(BULK_SYNC_DELAY));
        let invoice_sync = InvoiceSyncService::new(engagements, pay_apps, tokens.clone());
        let party_pull = PartyPullService::new(companies, tokens.clone());
        let cost_reports = CostReportService::new(manager.create_cost_cache_repository(), tokens.clone());
        let vendor_import =
            VendorImportService::new(tokens.clone()).with_delay(self.bulk_delay.unwrap_or(IMPORT_DELAY));
        let migrations = MigrationService::new(migration_repository.clone());

        Ok(ApplicationRuntime {
            config,
            tokens,
            engagement_sync,
            invoice_sync,
            party_pull,
            cost_reports,
            vendor_import,
            migrations,
            migration_repository,
        })
    }
}
