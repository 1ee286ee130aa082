use crate::error::FloconError;
use crate::types::{Engagement, EngagementParty};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait EngagementRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Engagement>, FloconError>;

    /// All engagements of type `project`, ordered by project number.
    /// With `only_unsynced`, just those without a QuickBooks job.
    async fn find_projects(&self, only_unsynced: bool) -> Result<Vec<Engagement>, FloconError>;

    async fn update_qbo_link(
        &self,
        id: &str,
        customer_id: &str,
        job_id: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<(), FloconError>;

    /// Nulls the QuickBooks columns of every project. Returns the number of rows touched.
    async fn clear_project_links(&self) -> Result<usize, FloconError>;

    /// Engagements already linked to a QuickBooks customer, any type
    async fn find_linked_to_customer(&self) -> Result<Vec<Engagement>, FloconError>;

    /// Sets the QuickBooks job of the engagements with this project number.
    /// Returns the number of rows touched.
    async fn set_job_id_by_project_number(
        &self,
        project_number: &str,
        job_id: &str,
    ) -> Result<usize, FloconError>;

    /// The primary party with the `customer` role
    async fn find_primary_customer_party(
        &self,
        engagement_id: &str,
    ) -> Result<Option<EngagementParty>, FloconError>;
}
