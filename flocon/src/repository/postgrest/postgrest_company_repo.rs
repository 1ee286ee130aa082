use super::{eq, ilike, PostgrestClient};
use crate::error::FloconError;
use crate::repository::company_repository::CompanyRepository;
use crate::types::{Company, CompanyUpdate, NewCompany, COMPANIES};
use async_trait::async_trait;

pub struct PostgrestCompanyRepository {
    client: PostgrestClient,
}

impl PostgrestCompanyRepository {
    pub fn new(client: PostgrestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompanyRepository for PostgrestCompanyRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Company>, FloconError> {
        self.client.select_first(COMPANIES, vec![("id", eq(id))]).await
    }

    async fn find_by_qbo_id(&self, qbo_id: &str) -> Result<Option<Company>, FloconError> {
        self.client
            .select_first(COMPANIES, vec![("qbo_id", eq(qbo_id))])
            .await
    }

    async fn find_by_name_ignore_case(&self, name: &str) -> Result<Option<Company>, FloconError> {
        self.client
            .select_first(COMPANIES, vec![("name", ilike(name))])
            .await
    }

    async fn insert(&self, company: &NewCompany) -> Result<Company, FloconError> {
        self.client.insert(COMPANIES, company).await
    }

    async fn update(&self, id: &str, update: &CompanyUpdate) -> Result<(), FloconError> {
        self.client
            .update(COMPANIES, vec![("id", eq(id))], update)
            .await?;
        Ok(())
    }
}
