use crate::error::FloconError;
use crate::types::MigrationRecord;
use async_trait::async_trait;

#[async_trait]
pub trait MigrationRepository: Send + Sync {
    /// Creates the `migration_history` table unless it is already there
    async fn ensure_history_table(&self) -> Result<(), FloconError>;

    /// Runs a raw SQL script against the database
    async fn exec_sql(&self, sql: &str) -> Result<(), FloconError>;

    /// Executed migrations, oldest first
    async fn executed(&self) -> Result<Vec<MigrationRecord>, FloconError>;

    async fn record(&self, filename: &str, checksum: &str) -> Result<(), FloconError>;
}
