use super::lock;
use crate::error::FloconError;
use crate::repository::migration_repository::MigrationRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::MigrationRecord;
use async_trait::async_trait;
use rusqlite::params;

pub struct SqliteMigrationRepository {
    connection: SharedSqliteConnection,
}

impl SqliteMigrationRepository {
    pub fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

const CREATE_MIGRATION_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL UNIQUE,
        executed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        checksum TEXT
    );
";

pub(crate) fn create_migration_table(conn: &SharedSqliteConnection) -> Result<(), FloconError> {
    let conn = lock(conn)?;
    conn.execute(CREATE_MIGRATION_TABLE_SQL, [])?;
    Ok(())
}

#[async_trait]
impl MigrationRepository for SqliteMigrationRepository {
    async fn ensure_history_table(&self) -> Result<(), FloconError> {
        create_migration_table(&self.connection)
    }

    async fn exec_sql(&self, sql: &str) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        conn.execute_batch(sql)
            .map_err(|e| FloconError::Sql(e.to_string()))
    }

    async fn executed(&self) -> Result<Vec<MigrationRecord>, FloconError> {
        let conn = lock(&self.connection)?;
        let mut stmt = conn.prepare(
            "SELECT filename, executed_at, checksum FROM migration_history ORDER BY executed_at, id",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(MigrationRecord {
                    filename: row.get(0)?,
                    executed_at: row.get(1)?,
                    checksum: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    async fn record(&self, filename: &str, checksum: &str) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        conn.execute(
            "INSERT INTO migration_history (filename, checksum) VALUES (?1, ?2)",
            params![filename, checksum],
        )?;
        Ok(())
    }
}
