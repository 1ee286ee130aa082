use super::{eq, PostgrestClient, IS_NULL};
use crate::error::FloconError;
use crate::repository::pay_app_repository::PayAppRepository;
use crate::types::{PayApp, PayAppUpdate, PAY_APPS};
use async_trait::async_trait;

const ORDER_BY_NUMBER: &str = "pay_app_number.asc";

pub struct PostgrestPayAppRepository {
    client: PostgrestClient,
}

impl PostgrestPayAppRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PayAppRepository for PostgrestPayAppRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<PayApp>, FloconError> {
        self.client.select_first(PAY_APPS, vec![("id", eq(id))]).await
    }

    async fn find_by_engagement(&self, engagement_id: &str) -> Result<Vec<PayApp>, FloconError> {
        self.client
            .select(
                PAY_APPS,
                vec![
                    ("engagement_id", eq(engagement_id)),
                    ("order", ORDER_BY_NUMBER.to_string()),
                ],
            )
            .await
    }

    async fn find_unlinked_by_engagement(
        &self,
        engagement_id: &str,
    ) -> Result<Vec<PayApp>, FloconError> {
        self.client
            .select(
                PAY_APPS,
                vec![
                    ("engagement_id", eq(engagement_id)),
                    ("qbo_invoice_id", IS_NULL.to_string()),
                    ("order", ORDER_BY_NUMBER.to_string()),
                ],
            )
            .await
    }

    async fn update(&self, id: &str, update: &PayAppUpdate) -> Result<(), FloconError> {
        let rows = self
            .client
            .update(PAY_APPS, vec![("id", eq(id))], update)
            .await?;
        if rows == 0 {
            return Err(FloconError::NotFound(format!("Pay app {id} not found")));
        }
        Ok(())
    }
}
