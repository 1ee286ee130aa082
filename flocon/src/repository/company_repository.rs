use crate::error::FloconError;
use crate::types::{Company, CompanyUpdate, NewCompany};
use async_trait::async_trait;

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Company>, FloconError>;

    async fn find_by_qbo_id(&self, qbo_id: &str) -> Result<Option<Company>, FloconError>;

    /// Case insensitive match on the whole name
    async fn find_by_name_ignore_case(&self, name: &str) -> Result<Option<Company>, FloconError>;

    async fn insert(&self, company: &NewCompany) -> Result<Company, FloconError>;

    async fn update(&self, id: &str, update: &CompanyUpdate) -> Result<(), FloconError>;
}
