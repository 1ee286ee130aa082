use crate::error::FloconError;
use crate::types::CostCacheEntry;
use async_trait::async_trait;

#[async_trait]
pub trait CostCacheRepository: Send + Sync {
    async fn find(&self, engagement_id: &str) -> Result<Option<CostCacheEntry>, FloconError>;

    /// Inserts, or replaces the row of the same engagement
    async fn upsert(&self, entry: &CostCacheEntry) -> Result<(), FloconError>;
}
