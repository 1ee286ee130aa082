use super::lock;
use crate::error::FloconError;
use crate::repository::engagement_repository::EngagementRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::{Engagement, EngagementParty, EngagementType, ROLE_CUSTOMER};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

pub struct SqliteEngagementRepository {
    connection: SharedSqliteConnection,
}

impl SqliteEngagementRepository {
    pub fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

const CREATE_ENGAGEMENT_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS engagements (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        project_number TEXT,
        type TEXT NOT NULL DEFAULT 'project',
        qbo_customer_id TEXT,
        qbo_job_id TEXT,
        qbo_last_synced_at DATETIME
    );
";

const CREATE_ENGAGEMENT_PARTIES_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS engagement_parties (
        engagement_id TEXT NOT NULL REFERENCES engagements(id),
        party_id TEXT NOT NULL,
        party_type TEXT NOT NULL,
        role TEXT NOT NULL,
        is_primary BOOLEAN NOT NULL DEFAULT 0
    );
";

const SELECT_ENGAGEMENT: &str = "SELECT id, name, project_number, type, qbo_customer_id, qbo_job_id, qbo_last_synced_at FROM engagements";

pub(crate) fn create_engagement_tables(conn: &SharedSqliteConnection) -> Result<(), FloconError> {
    let conn = lock(conn)?;
    conn.execute(CREATE_ENGAGEMENT_TABLE_SQL, [])?;
    conn.execute(CREATE_ENGAGEMENT_PARTIES_TABLE_SQL, [])?;
    Ok(())
}

fn engagement_from_row(row: &Row<'_>) -> rusqlite::Result<Engagement> {
    let kind: String = row.get(3)?;
    Ok(Engagement {
        id: row.get(0)?,
        name: row.get(1)?,
        project_number: row.get(2)?,
        kind: if kind == EngagementType::Prospect.as_str() {
            EngagementType::Prospect
        } else {
            EngagementType::Project
        },
        qbo_customer_id: row.get(4)?,
        qbo_job_id: row.get(5)?,
        qbo_last_synced_at: row.get(6)?,
    })
}

#[async_trait]
impl EngagementRepository for SqliteEngagementRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Engagement>, FloconError> {
        let conn = lock(&self.connection)?;
        let engagement = conn
            .query_row(
                &format!("{SELECT_ENGAGEMENT} WHERE id = ?1"),
                params![id],
                engagement_from_row,
            )
            .optional()?;
        Ok(engagement)
    }

    async fn find_projects(&self, only_unsynced: bool) -> Result<Vec<Engagement>, FloconError> {
        let conn = lock(&self.connection)?;
        let sql = format!(
            "{SELECT_ENGAGEMENT} WHERE type = ?1 {} ORDER BY project_number",
            if only_unsynced { "AND qbo_job_id IS NULL" } else { "" }
        );
        let mut stmt = conn.prepare(&sql)?;
        let engagements = stmt
            .query_map(params![EngagementType::Project.as_str()], engagement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(engagements)
    }

    async fn update_qbo_link(
        &self,
        id: &str,
        customer_id: &str,
        job_id: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        let rows = conn.execute(
            "UPDATE engagements SET qbo_customer_id = ?2, qbo_job_id = ?3, qbo_last_synced_at = ?4 WHERE id = ?1",
            params![id, customer_id, job_id, synced_at],
        )?;
        if rows == 0 {
            return Err(FloconError::NotFound(format!("Engagement {id} not found")));
        }
        Ok(())
    }

    async fn clear_project_links(&self) -> Result<usize, FloconError> {
        let conn = lock(&self.connection)?;
        let rows = conn.execute(
            "UPDATE engagements SET qbo_customer_id = NULL, qbo_job_id = NULL, qbo_last_synced_at = NULL WHERE type = ?1",
            params![EngagementType::Project.as_str()],
        )?;
        Ok(rows)
    }

    async fn find_linked_to_customer(&self) -> Result<Vec<Engagement>, FloconError> {
        let conn = lock(&self.connection)?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_ENGAGEMENT} WHERE qbo_customer_id IS NOT NULL ORDER BY project_number"
        ))?;
        let engagements = stmt
            .query_map([], engagement_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(engagements)
    }

    async fn set_job_id_by_project_number(
        &self,
        project_number: &str,
        job_id: &str,
    ) -> Result<usize, FloconError> {
        let conn = lock(&self.connection)?;
        let rows = conn.execute(
            "UPDATE engagements SET qbo_job_id = ?2 WHERE project_number = ?1",
            params![project_number, job_id],
        )?;
        Ok(rows)
    }

    async fn find_primary_customer_party(
        &self,
        engagement_id: &str,
    ) -> Result<Option<EngagementParty>, FloconError> {
        let conn = lock(&self.connection)?;
        let party = conn
            .query_row(
                "SELECT engagement_id, party_id, party_type, role, is_primary FROM engagement_parties
                 WHERE engagement_id = ?1 AND role = ?2 AND is_primary = 1 LIMIT 1",
                params![engagement_id, ROLE_CUSTOMER],
                |row| {
                    Ok(EngagementParty {
                        engagement_id: row.get(0)?,
                        party_id: row.get(1)?,
                        party_type: row.get(2)?,
                        role: row.get(3)?,
                        is_primary: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(party)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::{seed, setup};

    const PROJECTS: &str = r"
        INSERT INTO engagements (id, name, project_number, type, qbo_job_id) VALUES
            ('e2', 'Harbor View', '1291', 'project', '90'),
            ('e1', 'Lakeside Remodel', '1290', 'project', NULL),
            ('e3', 'Maybe Someday', NULL, 'prospect', NULL);
        INSERT INTO engagement_parties (engagement_id, party_id, party_type, role, is_primary) VALUES
            ('e1', 'c9', 'company', 'customer', 0),
            ('e1', 'c1', 'company', 'customer', 1),
            ('e1', 'c2', 'company', 'architect', 1);
    ";

    #[tokio::test]
    async fn projects_are_ordered_and_filtered() -> Result<(), FloconError> {
        let connection = setup()?;
        seed(&connection, PROJECTS);
        let repo = SqliteEngagementRepository::new(connection);

        let all = repo.find_projects(false).await?;
        assert_eq!(
            all.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["e1", "e2"]
        );

        let unsynced = repo.find_projects(true).await?;
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].project_number(), Some("1290"));
        Ok(())
    }

    #[tokio::test]
    async fn primary_customer_party_is_found() -> Result<(), FloconError> {
        let connection = setup()?;
        seed(&connection, PROJECTS);
        let repo = SqliteEngagementRepository::new(connection);

        let party = repo.find_primary_customer_party("e1").await?.unwrap();
        assert_eq!(party.party_id, "c1");
        assert!(repo.find_primary_customer_party("e2").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn link_and_clear() -> Result<(), FloconError> {
        let connection = setup()?;
        seed(&connection, PROJECTS);
        let repo = SqliteEngagementRepository::new(connection);

        repo.update_qbo_link("e1", "58", "88", Utc::now()).await?;
        let engagement = repo.find_by_id("e1").await?.unwrap();
        assert_eq!(engagement.qbo_job_id.as_deref(), Some("88"));
        assert!(engagement.qbo_last_synced_at.is_some());

        assert_eq!(repo.clear_project_links().await?, 2);
        assert!(repo.find_projects(true).await?.len() == 2);

        let missing = repo.update_qbo_link("nope", "58", "88", Utc::now()).await;
        assert!(matches!(missing, Err(FloconError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn customer_links_and_manual_job_ids() -> Result<(), FloconError> {
        let connection = setup()?;
        seed(&connection, PROJECTS);
        let repo = SqliteEngagementRepository::new(connection);
        assert!(repo.find_linked_to_customer().await?.is_empty());

        repo.update_qbo_link("e2", "58", "90", Utc::now()).await?;
        let linked = repo.find_linked_to_customer().await?;
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].qbo_customer_id.as_deref(), Some("58"));

        assert_eq!(repo.set_job_id_by_project_number("1290", "412").await?, 1);
        let engagement = repo.find_by_id("e1").await?.unwrap();
        assert_eq!(engagement.qbo_job_id.as_deref(), Some("412"));
        assert_eq!(repo.set_job_id_by_project_number("9999", "1").await?, 0);
        Ok(())
    }
}
