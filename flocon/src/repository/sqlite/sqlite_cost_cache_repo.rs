use super::lock;
use crate::error::FloconError;
use crate::repository::cost_cache_repository::CostCacheRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::CostCacheEntry;
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

pub struct SqliteCostCacheRepository {
    connection: SharedSqliteConnection,
}

impl SqliteCostCacheRepository {
    pub fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

const CREATE_COST_CACHE_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS qbo_cost_cache (
        engagement_id TEXT PRIMARY KEY NOT NULL,
        qbo_job_id TEXT NOT NULL,
        bills_total REAL NOT NULL DEFAULT 0,
        purchases_total REAL NOT NULL DEFAULT 0,
        payroll_total REAL NOT NULL DEFAULT 0,
        credits_total REAL NOT NULL DEFAULT 0,
        net_cost_to_date REAL NOT NULL DEFAULT 0,
        bills_count INTEGER NOT NULL DEFAULT 0,
        purchases_count INTEGER NOT NULL DEFAULT 0,
        payroll_count INTEGER NOT NULL DEFAULT 0,
        credits_count INTEGER NOT NULL DEFAULT 0,
        last_synced_at DATETIME NOT NULL
    );
";

pub(crate) fn create_cost_cache_table(conn: &SharedSqliteConnection) -> Result<(), FloconError> {
    let conn = lock(conn)?;
    conn.execute(CREATE_COST_CACHE_TABLE_SQL, [])?;
    Ok(())
}

#[async_trait]
impl CostCacheRepository for SqliteCostCacheRepository {
    async fn find(&self, engagement_id: &str) -> Result<Option<CostCacheEntry>, FloconError> {
        let conn = lock(&self.connection)?;
        let entry = conn
            .query_row(
                "SELECT engagement_id, qbo_job_id, bills_total, purchases_total, payroll_total, credits_total, net_cost_to_date,
                        bills_count, purchases_count, payroll_count, credits_count, last_synced_at
                 FROM qbo_cost_cache WHERE engagement_id = ?1",
                params![engagement_id],
                |row| {
                    Ok(CostCacheEntry {
                        engagement_id: row.get(0)?,
                        qbo_job_id: row.get(1)?,
                        bills_total: row.get(2)?,
                        purchases_total: row.get(3)?,
                        payroll_total: row.get(4)?,
                        credits_total: row.get(5)?,
                        net_cost_to_date: row.get(6)?,
                        bills_count: row.get(7)?,
                        purchases_count: row.get(8)?,
                        payroll_count: row.get(9)?,
                        credits_count: row.get(10)?,
                        last_synced_at: row.get(11)?,
                    })
                },
            )
            .optional()?;
        Ok(entry)
    }

    async fn upsert(&self, entry: &CostCacheEntry) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        conn.execute(
            "INSERT INTO qbo_cost_cache (engagement_id, qbo_job_id, bills_total, purchases_total, payroll_total, credits_total,
                                         net_cost_to_date, bills_count, purchases_count, payroll_count, credits_count, last_synced_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(engagement_id) DO UPDATE SET
                qbo_job_id = excluded.qbo_job_id,
                bills_total = excluded.bills_total,
                purchases_total = excluded.purchases_total,
                payroll_total = excluded.payroll_total,
                credits_total = excluded.credits_total,
                net_cost_to_date = excluded.net_cost_to_date,
                bills_count = excluded.bills_count,
                purchases_count = excluded.purchases_count,
                payroll_count = excluded.payroll_count,
                credits_count = excluded.credits_count,
                last_synced_at = excluded.last_synced_at",
            params![
                entry.engagement_id,
                entry.qbo_job_id,
                entry.bills_total,
                entry.purchases_total,
                entry.payroll_total,
                entry.credits_total,
                entry.net_cost_to_date,
                entry.bills_count,
                entry.purchases_count,
                entry.payroll_count,
                entry.credits_count,
                entry.last_synced_at,
            ],
        )?;
        Ok(())
    }
}
