use super::{eq, PostgrestClient};
use crate::error::FloconError;
use crate::repository::cost_cache_repository::CostCacheRepository;
use crate::types::{CostCacheEntry, QBO_COST_CACHE};
use async_trait::async_trait;

pub struct PostgrestCostCacheRepository {
    client: PostgrestClient,
}

impl PostgrestCostCacheRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CostCacheRepository for PostgrestCostCacheRepository {
    async fn find(&self, engagement_id: &str) -> Result<Option<CostCacheEntry>, FloconError> {
        self.client
            .select_first(QBO_COST_CACHE, vec![("engagement_id", eq(engagement_id))])
            .await
    }

    async fn upsert(&self, entry: &CostCacheEntry) -> Result<(), FloconError> {
        self.client.upsert(QBO_COST_CACHE, "engagement_id", entry).await
    }
}
