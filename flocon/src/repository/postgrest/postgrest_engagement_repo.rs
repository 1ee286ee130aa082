use super::{eq, Filters, PostgrestClient, IS_NULL, NOT_NULL};
use crate::error::FloconError;
use crate::repository::engagement_repository::EngagementRepository;
use crate::types::{
    Engagement, EngagementParty, EngagementType, ENGAGEMENTS, ENGAGEMENT_PARTIES, ROLE_CUSTOMER,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

pub struct PostgrestEngagementRepository {
    client: PostgrestClient,
}

impl PostgrestEngagementRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EngagementRepository for PostgrestEngagementRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Engagement>, FloconError> {
        self.client
            .select_first(ENGAGEMENTS, vec![("id", eq(id))])
            .await
    }

    async fn find_projects(&self, only_unsynced: bool) -> Result<Vec<Engagement>, FloconError> {
        let mut filters: Filters = vec![
            ("type", eq(EngagementType::Project.as_str())),
            ("order", "project_number.asc".to_string()),
        ];
        if only_unsynced {
            filters.push(("qbo_job_id", IS_NULL.to_string()));
        }
        self.client.select(ENGAGEMENTS, filters).await
    }

    async fn update_qbo_link(
        &self,
        id: &str,
        customer_id: &str,
        job_id: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<(), FloconError> {
        let changes = json!({
            "qbo_customer_id": customer_id,
            "qbo_job_id": job_id,
            "qbo_last_synced_at": synced_at,
        });
        let rows = self
            .client
            .update(ENGAGEMENTS, vec![("id", eq(id))], &changes)
            .await?;
        if rows == 0 {
            return Err(FloconError::NotFound(format!("Engagement {id} not found")));
        }
        Ok(())
    }

    async fn clear_project_links(&self) -> Result<usize, FloconError> {
        let changes = json!({
            "qbo_customer_id": Value::Null,
            "qbo_job_id": Value::Null,
            "qbo_last_synced_at": Value::Null,
        });
        self.client
            .update(
                ENGAGEMENTS,
                vec![("type", eq(EngagementType::Project.as_str()))],
                &changes,
            )
            .await
    }

    async fn find_linked_to_customer(&self) -> Result<Vec<Engagement>, FloconError> {
        self.client
            .select(
                ENGAGEMENTS,
                vec![
                    ("qbo_customer_id", NOT_NULL.to_string()),
                    ("order", "project_number.asc".to_string()),
                ],
            )
            .await
    }

    async fn set_job_id_by_project_number(
        &self,
        project_number: &str,
        job_id: &str,
    ) -> Result<usize, FloconError> {
        self.client
            .update(
                ENGAGEMENTS,
                vec![("project_number", eq(project_number))],
                &json!({ "qbo_job_id": job_id }),
            )
            .await
    }

    async fn find_primary_customer_party(
        &self,
        engagement_id: &str,
    ) -> Result<Option<EngagementParty>, FloconError> {
        self.client
            .select_first(
                ENGAGEMENT_PARTIES,
                vec![
                    ("engagement_id", eq(engagement_id)),
                    ("role", eq(ROLE_CUSTOMER)),
                    ("is_primary", eq(true)),
                ],
            )
            .await
    }
}
