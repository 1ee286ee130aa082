use super::{eq, PostgrestClient};
use crate::error::FloconError;
use crate::repository::token_repository::TokenRepository;
use crate::types::{QboToken, TokenUpsert, QBO_TOKENS};
use async_trait::async_trait;
use serde_json::json;

pub struct PostgrestTokenRepository {
    client: PostgrestClient,
}

impl PostgrestTokenRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenRepository for PostgrestTokenRepository {
    async fn find_active(&self) -> Result<Option<QboToken>, FloconError> {
        self.client
            .select_first(
                QBO_TOKENS,
                vec![
                    ("is_active", eq(true)),
                    ("order", "connected_at.desc".to_string()),
                ],
            )
            .await
    }

    async fn upsert(&self, token: &TokenUpsert) -> Result<(), FloconError> {
        self.client.upsert(QBO_TOKENS, "realm_id", token).await
    }

    async fn deactivate(&self, realm_id: &str) -> Result<(), FloconError> {
        self.client
            .update(
                QBO_TOKENS,
                vec![("realm_id", eq(realm_id))],
                &json!({ "is_active": false }),
            )
            .await?;
        Ok(())
    }
}
