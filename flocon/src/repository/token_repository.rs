use crate::error::FloconError;
use crate::types::{QboToken, TokenUpsert};
use async_trait::async_trait;

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// The active token that was connected most recently
    async fn find_active(&self) -> Result<Option<QboToken>, FloconError>;

    /// Inserts, or updates the row with the same `realm_id`
    async fn upsert(&self, token: &TokenUpsert) -> Result<(), FloconError>;

    async fn deactivate(&self, realm_id: &str) -> Result<(), FloconError>;
}
