use crate::error::FloconError;
use crate::repository::SharedSqliteConnection;
use rusqlite::Connection;
use std::fs;
use std::path::Path;
use std::sync::MutexGuard;

pub(crate) mod sqlite_company_repo;
pub(crate) mod sqlite_cost_cache_repo;
pub(crate) mod sqlite_engagement_repo;
pub(crate) mod sqlite_migration_repo;
pub(crate) mod sqlite_pay_app_repo;
pub(crate) mod sqlite_token_repo;

/// Creates the entire database schema by running schema creation functions for all entities.
#[allow(clippy::module_name_repetitions)]
pub(crate) fn create_schema(connection: &SharedSqliteConnection) -> Result<(), FloconError> {
    sqlite_company_repo::create_company_table(connection)?;
    sqlite_engagement_repo::create_engagement_tables(connection)?;
    sqlite_pay_app_repo::create_pay_app_table(connection)?;
    sqlite_token_repo::create_token_table(connection)?;
    sqlite_migration_repo::create_migration_table(connection)?;
    sqlite_cost_cache_repo::create_cost_cache_table(connection)?;
    Ok(())
}

pub(crate) fn create_connection(dbms_path: &Path) -> Result<Connection, FloconError> {
    if let Some(parent) = dbms_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let connection = Connection::open(dbms_path)?;
    Ok(connection)
}

pub(crate) fn lock(connection: &SharedSqliteConnection) -> Result<MutexGuard<'_, Connection>, FloconError> {
    connection.lock().map_err(|_| FloconError::LockPoisoned)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repository::database_manager::{DatabaseConfig, DatabaseManager};

    pub fn setup() -> Result<SharedSqliteConnection, FloconError> {
        DatabaseManager::new(&DatabaseConfig::SqliteInMemory)?.sqlite_connection()
    }

    /// Inserts rows the application only ever reads
    pub fn seed(connection: &SharedSqliteConnection, sql: &str) {
        lock(connection).unwrap().execute_batch(sql).unwrap();
    }

    #[test]
    fn schema_has_all_tables() -> Result<(), FloconError> {
        let connection = setup()?;
        let conn = lock(&connection)?;
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        for table in [
            "companies",
            "engagement_parties",
            "engagement_pay_apps",
            "engagements",
            "migration_history",
            "qbo_cost_cache",
            "qbo_tokens",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
        Ok(())
    }

    #[test]
    fn create_schema_twice_is_harmless() -> Result<(), FloconError> {
        let connection = setup()?;
        create_schema(&connection)?;
        Ok(())
    }
}
