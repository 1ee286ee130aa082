use crate::error::FloconError;
use crate::types::{PayApp, PayAppUpdate};
use async_trait::async_trait;

#[async_trait]
pub trait PayAppRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<PayApp>, FloconError>;

    /// Pay apps of the engagement, ordered by pay app number
    async fn find_by_engagement(&self, engagement_id: &str) -> Result<Vec<PayApp>, FloconError>;

    /// Pay apps of the engagement without a QuickBooks invoice, ordered by pay app number
    async fn find_unlinked_by_engagement(
        &self,
        engagement_id: &str,
    ) -> Result<Vec<PayApp>, FloconError>;

    async fn update(&self, id: &str, update: &PayAppUpdate) -> Result<(), FloconError>;
}
