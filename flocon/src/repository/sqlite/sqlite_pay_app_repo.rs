use super::lock;
use crate::error::FloconError;
use crate::repository::pay_app_repository::PayAppRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::{PayApp, PayAppUpdate, QboSyncStatus};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

pub struct SqlitePayAppRepository {
    connection: SharedSqliteConnection,
}

impl SqlitePayAppRepository {
    pub fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }

    fn find_many(&self, condition: &str, engagement_id: &str) -> Result<Vec<PayApp>, FloconError> {
        let conn = lock(&self.connection)?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_PAY_APP} WHERE {condition} ORDER BY pay_app_number"
        ))?;
        let pay_apps = stmt
            .query_map(params![engagement_id], pay_app_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pay_apps)
    }
}

const CREATE_PAY_APP_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS engagement_pay_apps (
        id TEXT PRIMARY KEY NOT NULL,
        engagement_id TEXT NOT NULL REFERENCES engagements(id),
        pay_app_number TEXT,
        description TEXT,
        amount REAL,
        current_payment_due REAL,
        period_end DATE,
        date_submitted DATE,
        status TEXT,
        qbo_invoice_id TEXT,
        qbo_sync_status TEXT,
        qbo_synced_at DATETIME,
        qbo_sync_error TEXT,
        qbo_payment_total REAL
    );
";

const SELECT_PAY_APP: &str = "SELECT id, engagement_id, pay_app_number, description, amount, current_payment_due, period_end, date_submitted, status, qbo_invoice_id, qbo_sync_status, qbo_synced_at, qbo_sync_error, qbo_payment_total FROM engagement_pay_apps";

pub(crate) fn create_pay_app_table(conn: &SharedSqliteConnection) -> Result<(), FloconError> {
    let conn = lock(conn)?;
    conn.execute(CREATE_PAY_APP_TABLE_SQL, [])?;
    Ok(())
}

fn sync_status_to_str(status: QboSyncStatus) -> &'static str {
    match status {
        QboSyncStatus::Synced => "synced",
        QboSyncStatus::Error => "error",
    }
}

fn pay_app_from_row(row: &Row<'_>) -> rusqlite::Result<PayApp> {
    let sync_status: Option<String> = row.get(10)?;
    Ok(PayApp {
        id: row.get(0)?,
        engagement_id: row.get(1)?,
        pay_app_number: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        current_payment_due: row.get(5)?,
        period_end: row.get(6)?,
        date_submitted: row.get(7)?,
        status: row.get(8)?,
        qbo_invoice_id: row.get(9)?,
        qbo_sync_status: match sync_status.as_deref() {
            Some("synced") => Some(QboSyncStatus::Synced),
            Some("error") => Some(QboSyncStatus::Error),
            _ => None,
        },
        qbo_synced_at: row.get(11)?,
        qbo_sync_error: row.get(12)?,
        qbo_payment_total: row.get(13)?,
    })
}

#[async_trait]
impl PayAppRepository for SqlitePayAppRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<PayApp>, FloconError> {
        let conn = lock(&self.connection)?;
        let pay_app = conn
            .query_row(
                &format!("{SELECT_PAY_APP} WHERE id = ?1"),
                params![id],
                pay_app_from_row,
            )
            .optional()?;
        Ok(pay_app)
    }

    async fn find_by_engagement(&self, engagement_id: &str) -> Result<Vec<PayApp>, FloconError> {
        self.find_many("engagement_id = ?1", engagement_id)
    }

    async fn find_unlinked_by_engagement(
        &self,
        engagement_id: &str,
    ) -> Result<Vec<PayApp>, FloconError> {
        self.find_many("engagement_id = ?1 AND qbo_invoice_id IS NULL", engagement_id)
    }

    async fn update(&self, id: &str, update: &PayAppUpdate) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        // ?6 tells whether qbo_sync_error is to be written at all, ?7 is the value (maybe NULL)
        let rows = conn.execute(
            "UPDATE engagement_pay_apps SET
                qbo_invoice_id = COALESCE(?2, qbo_invoice_id),
                qbo_sync_status = COALESCE(?3, qbo_sync_status),
                qbo_synced_at = COALESCE(?4, qbo_synced_at),
                qbo_payment_total = COALESCE(?5, qbo_payment_total),
                qbo_sync_error = CASE WHEN ?6 THEN ?7 ELSE qbo_sync_error END,
                status = COALESCE(?8, status)
             WHERE id = ?1",
            params![
                id,
                update.qbo_invoice_id,
                update.qbo_sync_status.map(sync_status_to_str),
                update.qbo_synced_at,
                update.qbo_payment_total,
                update.qbo_sync_error.is_some(),
                update.qbo_sync_error.clone().flatten(),
                update.status,
            ],
        )?;
        if rows == 0 {
            return Err(FloconError::NotFound(format!("Pay app {id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::{seed, setup};
    use chrono::{NaiveDate, Utc};

    const PAY_APPS: &str = r"
        INSERT INTO engagements (id, name, project_number, type) VALUES ('e1', 'Lakeside Remodel', '1290', 'project');
        INSERT INTO engagement_pay_apps (id, engagement_id, pay_app_number, current_payment_due, period_end, qbo_invoice_id, qbo_sync_status, qbo_sync_error) VALUES
            ('p2', 'e1', '2', 2500.0, '2024-04-30', NULL, 'error', 'QBO API error: 400 - bad'),
            ('p1', 'e1', '1', 1500.0, '2024-03-31', '130', 'synced', NULL);
    ";

    #[tokio::test]
    async fn pay_apps_are_ordered_by_number() -> Result<(), FloconError> {
        let connection = setup()?;
        seed(&connection, PAY_APPS);
        let repo = SqlitePayAppRepository::new(connection);

        let all = repo.find_by_engagement("e1").await?;
        assert_eq!(all.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["p1", "p2"]);
        assert_eq!(all[0].period_end, NaiveDate::from_ymd_opt(2024, 3, 31));
        assert_eq!(all[0].qbo_sync_status, Some(QboSyncStatus::Synced));

        let unlinked = repo.find_unlinked_by_engagement("e1").await?;
        assert_eq!(unlinked.len(), 1);
        assert_eq!(unlinked[0].id, "p2");
        Ok(())
    }

    #[tokio::test]
    async fn synced_update_clears_error_and_failed_update_keeps_invoice() -> Result<(), FloconError> {
        let connection = setup()?;
        seed(&connection, PAY_APPS);
        let repo = SqlitePayAppRepository::new(connection);

        repo.update("p2", &PayAppUpdate::synced("131", Utc::now())).await?;
        let p2 = repo.find_by_id("p2").await?.unwrap();
        assert_eq!(p2.qbo_invoice_id.as_deref(), Some("131"));
        assert_eq!(p2.qbo_sync_error, None);

        repo.update("p1", &PayAppUpdate::failed("boom")).await?;
        let p1 = repo.find_by_id("p1").await?.unwrap();
        assert_eq!(p1.qbo_invoice_id.as_deref(), Some("130"));
        assert_eq!(p1.qbo_sync_status, Some(QboSyncStatus::Error));
        assert_eq!(p1.qbo_sync_error.as_deref(), Some("boom"));
        Ok(())
    }
}
