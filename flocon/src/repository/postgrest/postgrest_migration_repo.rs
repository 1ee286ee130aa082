use super::PostgrestClient;
use crate::error::FloconError;
use crate::repository::migration_repository::MigrationRepository;
use crate::types::{MigrationRecord, MIGRATION_HISTORY};
use async_trait::async_trait;
use serde_json::json;

const CREATE_MIGRATION_HISTORY_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS migration_history (
        id SERIAL PRIMARY KEY,
        filename VARCHAR(255) UNIQUE NOT NULL,
        executed_at TIMESTAMPTZ DEFAULT NOW(),
        checksum TEXT
    );
";

/// Raw SQL goes through the `exec_sql(sql text)` database function
const EXEC_SQL: &str = "exec_sql";

pub struct PostgrestMigrationRepository {
    client: PostgrestClient,
}

impl PostgrestMigrationRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MigrationRepository for PostgrestMigrationRepository {
    async fn ensure_history_table(&self) -> Result<(), FloconError> {
        self.exec_sql(CREATE_MIGRATION_HISTORY_SQL).await
    }

    async fn exec_sql(&self, sql: &str) -> Result<(), FloconError> {
        self.client.rpc(EXEC_SQL, &json!({ "sql": sql })).await?;
        Ok(())
    }

    async fn executed(&self) -> Result<Vec<MigrationRecord>, FloconError> {
        self.client
            .select(
                MIGRATION_HISTORY,
                vec![("order", "executed_at.asc".to_string())],
            )
            .await
    }

    async fn record(&self, filename: &str, checksum: &str) -> Result<(), FloconError> {
        self.client
            .insert_minimal(
                MIGRATION_HISTORY,
                &json!({ "filename": filename, "checksum": checksum }),
            )
            .await
    }
}
