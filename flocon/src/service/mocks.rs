//! Mocked repositories for the service unit tests
use crate::error::FloconError;
use crate::repository::company_repository::CompanyRepository;
use crate::repository::cost_cache_repository::CostCacheRepository;
use crate::repository::engagement_repository::EngagementRepository;
use crate::repository::migration_repository::MigrationRepository;
use crate::repository::pay_app_repository::PayAppRepository;
use crate::repository::token_repository::TokenRepository;
use crate::service::token::TokenService;
use crate::types::{
    Company, CompanyUpdate, CostCacheEntry, Engagement, EngagementParty, MigrationRecord, NewCompany, PayApp,
    PayAppUpdate, QboToken, TokenUpsert,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use qbo::config::QboClientConfiguration;
use qbo::oauth::OAuthClient;
use std::sync::Arc;

mock! {
    pub EngagementRepo {}

    #[async_trait]
    impl EngagementRepository for EngagementRepo {
        async fn find_by_id(&self, id: &str) -> Result<Option<Engagement>, FloconError>;
        async fn find_projects(&self, only_unsynced: bool) -> Result<Vec<Engagement>, FloconError>;
        async fn update_qbo_link(
            &self,
            id: &str,
            customer_id: &str,
            job_id: &str,
            synced_at: DateTime<Utc>,
        ) -> Result<(), FloconError>;
        async fn clear_project_links(&self) -> Result<usize, FloconError>;
        async fn find_linked_to_customer(&self) -> Result<Vec<Engagement>, FloconError>;
        async fn set_job_id_by_project_number(
            &self,
            project_number: &str,
            job_id: &str,
        ) -> Result<usize, FloconError>;
        async fn find_primary_customer_party(
            &self,
            engagement_id: &str,
        ) -> Result<Option<EngagementParty>, FloconError>;
    }
}

mock! {
    pub CompanyRepo {}

    #[async_trait]
    impl CompanyRepository for CompanyRepo {
        async fn find_by_id(&self, id: &str) -> Result<Option<Company>, FloconError>;
        async fn find_by_qbo_id(&self, qbo_id: &str) -> Result<Option<Company>, FloconError>;
        async fn find_by_name_ignore_case(&self, name: &str) -> Result<Option<Company>, FloconError>;
        async fn insert(&self, company: &NewCompany) -> Result<Company, FloconError>;
        async fn update(&self, id: &str, update: &CompanyUpdate) -> Result<(), FloconError>;
    }
}

mock! {
    pub PayAppRepo {}

    #[async_trait]
    impl PayAppRepository for PayAppRepo {
        async fn find_by_id(&self, id: &str) -> Result<Option<PayApp>, FloconError>;
        async fn find_by_engagement(&self, engagement_id: &str) -> Result<Vec<PayApp>, FloconError>;
        async fn find_unlinked_by_engagement(&self, engagement_id: &str) -> Result<Vec<PayApp>, FloconError>;
        async fn update(&self, id: &str, update: &PayAppUpdate) -> Result<(), FloconError>;
    }
}

mock! {
    pub TokenRepo {}

    #[async_trait]
    impl TokenRepository for TokenRepo {
        async fn find_active(&self) -> Result<Option<QboToken>, FloconError>;
        async fn upsert(&self, token: &TokenUpsert) -> Result<(), FloconError>;
        async fn deactivate(&self, realm_id: &str) -> Result<(), FloconError>;
    }
}

mock! {
    pub MigrationRepo {}

    #[async_trait]
    impl MigrationRepository for MigrationRepo {
        async fn ensure_history_table(&self) -> Result<(), FloconError>;
        async fn exec_sql(&self, sql: &str) -> Result<(), FloconError>;
        async fn executed(&self) -> Result<Vec<MigrationRecord>, FloconError>;
        async fn record(&self, filename: &str, checksum: &str) -> Result<(), FloconError>;
    }
}

mock! {
    pub CostCacheRepo {}

    #[async_trait]
    impl CostCacheRepository for CostCacheRepo {
        async fn find(&self, engagement_id: &str) -> Result<Option<CostCacheEntry>, FloconError>;
        async fn upsert(&self, entry: &CostCacheEntry) -> Result<(), FloconError>;
    }
}

/// A token service with nothing stored, i.e. never connected
pub fn disconnected() -> Arc<TokenService> {
    let mut repo = MockTokenRepo::new();
    repo.expect_find_active().returning(|| Ok(None));
    Arc::new(TokenService::new(
        Arc::new(repo),
        OAuthClient::new(QboClientConfiguration::default()),
    ))
}
