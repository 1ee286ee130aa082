use super::{lock, new_id};
use crate::error::FloconError;
use crate::repository::token_repository::TokenRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::{QboToken, TokenUpsert};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

pub struct SqliteTokenRepository {
    connection: SharedSqliteConnection,
}

impl SqliteTokenRepository {
    pub fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }
}

const CREATE_TOKEN_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS qbo_tokens (
        id TEXT PRIMARY KEY NOT NULL,
        realm_id TEXT NOT NULL UNIQUE,
        access_token TEXT NOT NULL,
        refresh_token TEXT NOT NULL,
        token_type TEXT,
        expires_at DATETIME NOT NULL,
        refresh_expires_at DATETIME NOT NULL,
        scope TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1,
        connected_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        last_refreshed_at DATETIME
    );
";

pub(crate) fn create_token_table(conn: &SharedSqliteConnection) -> Result<(), FloconError> {
    let conn = lock(conn)?;
    conn.execute(CREATE_TOKEN_TABLE_SQL, [])?;
    Ok(())
}

#[async_trait]
impl TokenRepository for SqliteTokenRepository {
    async fn find_active(&self) -> Result<Option<QboToken>, FloconError> {
        let conn = lock(&self.connection)?;
        let token = conn
            .query_row(
                "SELECT id, realm_id, access_token, refresh_token, token_type, expires_at, refresh_expires_at, scope, is_active, connected_at, last_refreshed_at
                 FROM qbo_tokens WHERE is_active = 1 ORDER BY connected_at DESC, rowid DESC LIMIT 1",
                [],
                |row| {
                    Ok(QboToken {
                        id: row.get(0)?,
                        realm_id: row.get(1)?,
                        access_token: row.get(2)?,
                        refresh_token: row.get(3)?,
                        token_type: row.get(4)?,
                        expires_at: row.get(5)?,
                        refresh_expires_at: row.get(6)?,
                        scope: row.get(7)?,
                        is_active: row.get(8)?,
                        connected_at: row.get(9)?,
                        last_refreshed_at: row.get(10)?,
                    })
                },
            )
            .optional()?;
        Ok(token)
    }

    async fn upsert(&self, token: &TokenUpsert) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        conn.execute(
            "INSERT INTO qbo_tokens (id, realm_id, access_token, refresh_token, token_type, expires_at, refresh_expires_at, scope, is_active, last_refreshed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(realm_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                token_type = excluded.token_type,
                expires_at = excluded.expires_at,
                refresh_expires_at = excluded.refresh_expires_at,
                scope = excluded.scope,
                is_active = excluded.is_active,
                last_refreshed_at = excluded.last_refreshed_at",
            params![
                new_id(),
                token.realm_id,
                token.access_token,
                token.refresh_token,
                token.token_type,
                token.expires_at,
                token.refresh_expires_at,
                token.scope,
                token.is_active,
                token.last_refreshed_at,
            ],
        )?;
        Ok(())
    }

    async fn deactivate(&self, realm_id: &str) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        conn.execute(
            "UPDATE qbo_tokens SET is_active = 0 WHERE realm_id = ?1",
            params![realm_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::setup;
    use chrono::{Duration, Utc};

    fn token(realm_id: &str, access_token: &str) -> TokenUpsert {
        let now = Utc::now();
        TokenUpsert {
            realm_id: realm_id.to_string(),
            access_token: access_token.to_string(),
            refresh_token: format!("refresh-{access_token}"),
            token_type: "bearer".to_string(),
            expires_at: now + Duration::seconds(3600),
            refresh_expires_at: now + Duration::days(100),
            scope: Some("com.intuit.quickbooks.accounting".to_string()),
            is_active: true,
            last_refreshed_at: now,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_tokens_of_the_same_realm() -> Result<(), FloconError> {
        let repo = SqliteTokenRepository::new(setup()?);
        assert!(repo.find_active().await?.is_none());

        repo.upsert(&token("9341", "first")).await?;
        let first = repo.find_active().await?.unwrap();
        repo.upsert(&token("9341", "second")).await?;
        let second = repo.find_active().await?.unwrap();

        assert_eq!(second.access_token, "second");
        assert_eq!(second.refresh_token, "refresh-second");
        assert_eq!(second.id, first.id);
        assert_eq!(second.connected_at, first.connected_at);
        Ok(())
    }

    #[tokio::test]
    async fn deactivated_tokens_are_not_active() -> Result<(), FloconError> {
        let repo = SqliteTokenRepository::new(setup()?);
        repo.upsert(&token("9341", "abc")).await?;
        repo.deactivate("9341").await?;
        assert!(repo.find_active().await?.is_none());
        Ok(())
    }
}
