//! Pushes engagements to QuickBooks: the primary customer company becomes a QBO customer
//! and the project becomes a job (sub-customer) below it.
use crate::error::FloconError;
use crate::repository::company_repository::CompanyRepository;
use crate::repository::engagement_repository::EngagementRepository;
use crate::service::token::TokenService;
use crate::types::{
    BackfillResult, BackfilledCompany, BatchResult, Company, CompanyUpdate, Engagement,
    MultiSyncResult, ProjectSummary, ProjectSyncResult, SyncResult, SyncStatusReport,
    PARTY_TYPE_COMPANY,
};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use qbo::models::customer::Customer;
use qbo::QuickBooks;
use std::sync::Arc;
use std::time::Duration;

/// Pause between projects in a bulk sync, keeps us below the QBO rate limits
pub const BULK_SYNC_DELAY: Duration = Duration::from_millis(500);

const RECENTLY_SYNCED: usize = 5;

pub struct EngagementSyncService {
    engagements: Arc<dyn EngagementRepository>,
    companies: Arc<dyn CompanyRepository>,
    tokens: Arc<TokenService>,
    bulk_delay: Duration,
}

impl EngagementSyncService {
    pub fn new(
        engagements: Arc<dyn EngagementRepository>,
        companies: Arc<dyn CompanyRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            engagements,
            companies,
            tokens,
            bulk_delay: BULK_SYNC_DELAY,
        }
    }

    #[must_use]
    pub fn with_bulk_delay(mut self, delay: Duration) -> Self {
        self.bulk_delay = delay;
        self
    }

    /// Links the engagement to its QuickBooks customer and job, creating the customer
    /// when it does not exist. The job is only created if `create_if_not_found` is set.
    pub async fn sync_engagement(&self, engagement_id: &str, create_if_not_found: bool) -> SyncResult {
        match self.try_sync(engagement_id, create_if_not_found).await {
            Ok(result) => result,
            Err(e) => {
                error!("Sync of engagement {engagement_id} failed: {e}");
                SyncResult::failed(e.to_string())
            }
        }
    }

    async fn try_sync(&self, engagement_id: &str, create_if_not_found: bool) -> Result<SyncResult, FloconError> {
        let engagement = self
            .engagements
            .find_by_id(engagement_id)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| FloconError::NotFound("Engagement not found".to_string()))?;

        let Some(project_number) = engagement.project_number() else {
            return Err(FloconError::Sync(
                "Project must have a project_number before syncing to QuickBooks".to_string(),
            ));
        };

        let company = self
            .customer_company(engagement_id)
            .await
            .ok_or_else(|| FloconError::NotFound("No customer found for this engagement".to_string()))?;

        let client = self.tokens.authenticated_client().await?;
        let customer = Self::resolve_customer(&client, &company).await?;

        let job = match find_job(&client, project_number, customer.id()).await {
            Some(job) => {
                debug!("Found existing job: {:?} ({})", job.display_name, job.id());
                job
            }
            None if create_if_not_found => {
                info!("Creating job: {project_number} - {}", engagement.name);
                client
                    .create_job(customer.id(), project_number, &engagement.name)
                    .await?
            }
            None => {
                return Err(FloconError::Sync(format!(
                    "QuickBooks project not found for {project_number}. Create it in QuickBooks first or use \"Create New Project\" action."
                )))
            }
        };

        let now = Utc::now();
        if let Err(e) = self
            .engagements
            .update_qbo_link(engagement_id, customer.id(), job.id(), now)
            .await
        {
            error!("Error updating engagement {engagement_id}: {e}");
            return Err(FloconError::Database(
                "Failed to update engagement with QB IDs".to_string(),
            ));
        }

        let update = CompanyUpdate {
            qbo_id: Some(customer.id().to_string()),
            qbo_last_synced_at: Some(now),
            ..Default::default()
        };
        if let Err(e) = self.companies.update(&company.id, &update).await {
            warn!("Error updating company {} with QB ID: {e}", company.id);
        }

        Ok(SyncResult {
            success: true,
            customer_id: Some(customer.id().to_string()),
            job_id: Some(job.id().to_string()),
            error: None,
        })
    }

    /// The company that is the primary customer of the engagement
    async fn customer_company(&self, engagement_id: &str) -> Option<Company> {
        let party = match self.engagements.find_primary_customer_party(engagement_id).await {
            Ok(Some(party)) => party,
            Ok(None) => return None,
            Err(e) => {
                error!("Error getting customer party: {e}");
                return None;
            }
        };
        if party.party_type != PARTY_TYPE_COMPANY {
            error!("Customer party of {engagement_id} is not a company");
            return None;
        }
        self.companies
            .find_by_id(&party.party_id)
            .await
            .map_err(|e| error!("Error getting company {}: {e}", party.party_id))
            .ok()
            .flatten()
    }

    /// The customer linked to the company, renamed to match it when needed. A customer
    /// that can not be fetched or renamed is looked up by name instead.
    async fn resolve_customer(client: &QuickBooks, company: &Company) -> Result<Customer, FloconError> {
        if let Some(qbo_id) = company.qbo_id.as_deref().filter(|id| !id.is_empty()) {
            match client.get_customer(qbo_id).await {
                Ok(customer) if customer.display_name.as_deref() == Some(company.name.as_str()) => {
                    return Ok(customer);
                }
                Ok(customer) => {
                    info!(
                        "Customer name changed: {:?} -> {:?}",
                        customer.display_name, company.name
                    );
                    match client.update_customer_name(qbo_id, &company.name).await {
                        Ok(renamed) => return Ok(renamed),
                        Err(e) => warn!("Error renaming QB customer {qbo_id}, will search by name: {e}"),
                    }
                }
                Err(e) => warn!("Error fetching QB customer {qbo_id}, will search by name: {e}"),
            }
        }
        find_or_create_customer(client, &company.name).await
    }

    /// Syncs the engagements one after the other, tallying each outcome
    pub async fn sync_multiple(&self, engagement_ids: &[String]) -> MultiSyncResult {
        let mut outcome = MultiSyncResult::default();
        for id in engagement_ids {
            let result = self.sync_engagement(id, false).await;
            if result.success {
                outcome.success += 1;
            } else {
                outcome.failed += 1;
            }
            outcome.results.push(result);
        }
        outcome
    }

    /// Syncs every project, ordered by project number, optionally only the ones without a job.
    ///
    /// # Errors
    /// Returns an error if the projects can not be listed
    pub async fn sync_all_projects(
        &self,
        only_unsynced: bool,
    ) -> Result<BatchResult<ProjectSyncResult>, FloconError> {
        let projects = self.engagements.find_projects(only_unsynced).await?;
        let mut batch = BatchResult::default();
        for (i, project) in projects.iter().enumerate() {
            if i > 0 && !self.bulk_delay.is_zero() {
                tokio::time::sleep(self.bulk_delay).await;
            }
            info!(
                "Syncing project {}: {}",
                project.project_number.as_deref().unwrap_or_default(),
                project.name
            );
            let result = self.sync_engagement(&project.id, false).await;
            let success = result.success;
            batch.record(project_result(project, result), success);
        }
        Ok(batch)
    }

    /// Forgets all project links to QuickBooks and syncs every project again
    ///
    /// # Errors
    /// Returns an error if the links can not be cleared or the projects not listed
    pub async fn clear_and_resync(&self) -> Result<BatchResult<ProjectSyncResult>, FloconError> {
        let cleared = self
            .engagements
            .clear_project_links()
            .await
            .map_err(|e| FloconError::Database(format!("Failed to clear sync data: {e}")))?;
        info!("Cleared QuickBooks links of {cleared} projects");
        self.sync_all_projects(false).await
    }

    /// Points the engagements with this project number at a QuickBooks job picked by hand
    ///
    /// # Errors
    /// `NotFound` when no engagement has the project number, otherwise the database error
    pub async fn set_job_id(&self, project_number: &str, job_id: &str) -> Result<usize, FloconError> {
        let project_number = project_number.trim();
        let job_id = job_id.trim();
        if project_number.is_empty() || job_id.is_empty() {
            return Err(FloconError::BadInput(
                "project number and job id are required".to_string(),
            ));
        }
        let rows = self
            .engagements
            .set_job_id_by_project_number(project_number, job_id)
            .await?;
        if rows == 0 {
            return Err(FloconError::NotFound(format!(
                "No engagement with project number {project_number}"
            )));
        }
        info!("Project {project_number} now uses QuickBooks job {job_id}");
        Ok(rows)
    }

    /// Copies the customer id of every linked engagement onto its customer company.
    /// When several engagements share a company, the most recently synced one wins.
    /// Companies that already have a QuickBooks id are left alone.
    ///
    /// # Errors
    /// Returns an error if the linked engagements can not be listed
    pub async fn backfill_company_qbo_ids(&self) -> Result<BackfillResult, FloconError> {
        let engagements = self.engagements.find_linked_to_customer().await?;
        let mut result = BackfillResult {
            engagements: engagements.len(),
            ..Default::default()
        };

        let mut links: Vec<(String, String, Option<DateTime<Utc>>)> = Vec::new();
        for engagement in &engagements {
            let Some(customer_id) = engagement.qbo_customer_id.as_deref() else {
                continue;
            };
            let party = match self.engagements.find_primary_customer_party(&engagement.id).await {
                Ok(Some(party)) if party.party_type == PARTY_TYPE_COMPANY => party,
                Ok(_) => {
                    debug!("Engagement {}: no company customer found", engagement.id);
                    result.skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Engagement {}: error getting customer party: {e}", engagement.id);
                    result.skipped += 1;
                    continue;
                }
            };
            match links.iter_mut().find(|link| link.0 == party.party_id) {
                Some(link) if engagement.qbo_last_synced_at > link.2 => {
                    link.1 = customer_id.to_string();
                    link.2 = engagement.qbo_last_synced_at;
                }
                Some(_) => {}
                None => links.push((
                    party.party_id,
                    customer_id.to_string(),
                    engagement.qbo_last_synced_at,
                )),
            }
        }
        result.companies = links.len();

        for (company_id, qbo_id, synced_at) in links {
            let company = match self.companies.find_by_id(&company_id).await {
                Ok(Some(company)) => company,
                Ok(None) => continue,
                Err(e) => {
                    result.errors.push(format!("{company_id}: {e}"));
                    continue;
                }
            };
            if company.qbo_id.as_deref().is_some_and(|id| !id.is_empty()) {
                result.already_linked += 1;
                continue;
            }
            let update = CompanyUpdate {
                qbo_id: Some(qbo_id.clone()),
                qbo_last_synced_at: synced_at,
                ..Default::default()
            };
            match self.companies.update(&company_id, &update).await {
                Ok(()) => {
                    info!("{}: updated with QB ID {qbo_id}", company.name);
                    result.updated.push(BackfilledCompany {
                        company_id,
                        name: company.name,
                        qbo_id,
                    });
                }
                Err(e) => result.errors.push(format!("{}: {e}", company.name)),
            }
        }
        Ok(result)
    }

    /// # Errors
    /// Returns an error if the projects can not be listed
    pub async fn status_report(&self) -> Result<SyncStatusReport, FloconError> {
        let projects = self.engagements.find_projects(false).await?;
        let (synced, unsynced): (Vec<&Engagement>, Vec<&Engagement>) =
            projects.iter().partition(|p| p.is_synced());

        let mut recent = synced.clone();
        recent.sort_by(|a, b| b.qbo_last_synced_at.cmp(&a.qbo_last_synced_at));

        Ok(SyncStatusReport {
            total: projects.len(),
            synced: synced.len(),
            unsynced: unsynced.len(),
            unsynced_projects: unsynced.into_iter().map(ProjectSummary::from).collect(),
            recently_synced: recent
                .into_iter()
                .take(RECENTLY_SYNCED)
                .map(ProjectSummary::from)
                .collect(),
        })
    }
}

fn project_result(project: &Engagement, result: SyncResult) -> ProjectSyncResult {
    ProjectSyncResult {
        project_id: project.id.clone(),
        project_number: project.project_number.clone(),
        name: project.name.clone(),
        result,
    }
}

/// A failed lookup counts as "not found", which creates the customer
async fn find_or_create_customer(client: &QuickBooks, name: &str) -> Result<Customer, FloconError> {
    match client.find_customer_by_name(name).await {
        Ok(Some(customer)) => {
            debug!("Found existing customer: {name} ({})", customer.id());
            return Ok(customer);
        }
        Ok(None) => {}
        Err(e) => error!("Error finding customer {name}: {e}"),
    }
    info!("Creating new customer: {name}");
    Ok(client.create_customer(&Customer::named(name)).await?)
}

/// The job for the project number below the customer; lookup errors count as "not found"
async fn find_job(client: &QuickBooks, project_number: &str, customer_id: &str) -> Option<Customer> {
    match client.find_jobs_by_project_number(project_number).await {
        Ok(jobs) => jobs.into_iter().find(|job| {
            customer_id.is_empty()
                || job.parent_ref.as_ref().is_some_and(|p| p.value == customer_id)
        }),
        Err(e) => {
            error!("Error finding job {project_number}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mocks::{disconnected, MockCompanyRepo, MockEngagementRepo};
    use crate::types::EngagementParty;

    fn project(id: &str, number: Option<&str>, job: Option<&str>) -> Engagement {
        Engagement {
            id: id.to_string(),
            name: format!("Project {id}"),
            project_number: number.map(ToString::to_string),
            qbo_job_id: job.map(ToString::to_string),
            ..Default::default()
        }
    }

    fn service(engagements: MockEngagementRepo) -> EngagementSyncService {
        EngagementSyncService::new(
            Arc::new(engagements),
            Arc::new(MockCompanyRepo::new()),
            disconnected(),
        )
        .with_bulk_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn missing_engagement_fails() {
        let mut engagements = MockEngagementRepo::new();
        engagements.expect_find_by_id().returning(|_| Ok(None));
        engagements.expect_update_qbo_link().never();

        let result = service(engagements).sync_engagement("nope", false).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Engagement not found"));
    }

    #[tokio::test]
    async fn blank_project_number_fails() {
        let mut engagements = MockEngagementRepo::new();
        engagements
            .expect_find_by_id()
            .returning(|_| Ok(Some(project("e1", Some("  "), None))));

        let result = service(engagements).sync_engagement("e1", true).await;
        assert_eq!(
            result.error.as_deref(),
            Some("Project must have a project_number before syncing to QuickBooks")
        );
    }

    #[tokio::test]
    async fn contact_customer_is_not_accepted() {
        let mut engagements = MockEngagementRepo::new();
        engagements
            .expect_find_by_id()
            .returning(|_| Ok(Some(project("e1", Some("1290"), None))));
        engagements.expect_find_primary_customer_party().returning(|_| {
            Ok(Some(EngagementParty {
                engagement_id: "e1".into(),
                party_id: "p1".into(),
                party_type: "contact".into(),
                role: "customer".into(),
                is_primary: Some(true),
            }))
        });

        let result = service(engagements).sync_engagement("e1", true).await;
        assert_eq!(result.error.as_deref(), Some("No customer found for this engagement"));
    }

    #[tokio::test]
    async fn sync_multiple_counts_each_item() {
        let mut engagements = MockEngagementRepo::new();
        engagements.expect_find_by_id().returning(|id| {
            Ok(match id {
                "e1" => Some(project("e1", None, None)),
                _ => None,
            })
        });

        let outcome = service(engagements)
            .sync_multiple(&["e1".to_string(), "e2".to_string()])
            .await;
        assert_eq!((outcome.success, outcome.failed), (0, 2));
        assert_eq!(outcome.results.len(), 2);
    }

    #[tokio::test]
    async fn status_report_splits_synced_and_unsynced() {
        let mut engagements = MockEngagementRepo::new();
        engagements.expect_find_projects().returning(|_| {
            let mut older = project("e1", Some("1001"), Some("81"));
            older.qbo_last_synced_at = Some(Utc::now() - chrono::Duration::days(2));
            let mut newer = project("e2", Some("1002"), Some("82"));
            newer.qbo_last_synced_at = Some(Utc::now());
            Ok(vec![older, newer, project("e3", Some("1003"), None)])
        });

        let report = service(engagements).status_report().await.unwrap();
        assert_eq!((report.total, report.synced, report.unsynced), (3, 2, 1));
        assert_eq!(report.unsynced_projects[0].id, "e3");
        assert_eq!(report.recently_synced[0].id, "e2");
    }

    fn party(engagement_id: &str, party_id: &str, party_type: &str) -> EngagementParty {
        EngagementParty {
            engagement_id: engagement_id.into(),
            party_id: party_id.into(),
            party_type: party_type.into(),
            role: "customer".into(),
            is_primary: Some(true),
        }
    }

    fn linked(id: &str, customer_id: &str, synced_days_ago: i64) -> Engagement {
        Engagement {
            qbo_customer_id: Some(customer_id.into()),
            qbo_last_synced_at: Some(Utc::now() - chrono::Duration::days(synced_days_ago)),
            ..project(id, Some("1290"), Some("88"))
        }
    }

    #[tokio::test]
    async fn backfill_takes_the_latest_link_per_company() {
        let mut engagements = MockEngagementRepo::new();
        engagements.expect_find_linked_to_customer().returning(|| {
            Ok(vec![
                linked("e1", "58", 5),
                linked("e2", "61", 1),
                linked("e3", "70", 2),
                linked("e4", "71", 2),
            ])
        });
        engagements
            .expect_find_primary_customer_party()
            .returning(|id| {
                Ok(match id {
                    "e1" | "e2" => Some(party(id, "c1", "company")),
                    "e3" => Some(party(id, "c2", "company")),
                    _ => Some(party(id, "p9", "contact")),
                })
            });
        let mut companies = MockCompanyRepo::new();
        companies.expect_find_by_id().returning(|id| {
            Ok(Some(Company {
                id: id.into(),
                name: format!("Company {id}"),
                qbo_id: (id == "c2").then(|| "70".to_string()),
                ..Default::default()
            }))
        });
        companies
            .expect_update()
            .withf(|id: &str, update: &CompanyUpdate| {
                id == "c1" && update.qbo_id.as_deref() == Some("61")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let service = EngagementSyncService::new(Arc::new(engagements), Arc::new(companies), disconnected());
        let result = service.backfill_company_qbo_ids().await.unwrap();
        assert_eq!((result.engagements, result.companies), (4, 2));
        assert_eq!((result.already_linked, result.skipped), (1, 1));
        assert_eq!(result.updated.len(), 1);
        assert_eq!(result.updated[0].qbo_id, "61");
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn set_job_id_requires_a_matching_project() {
        let mut engagements = MockEngagementRepo::new();
        engagements
            .expect_set_job_id_by_project_number()
            .returning(|number, _| Ok(usize::from(number == "1252")));

        let service = service(engagements);
        assert_eq!(service.set_job_id("1252", "59").await.unwrap(), 1);
        assert!(matches!(
            service.set_job_id("9999", "59").await,
            Err(FloconError::NotFound(_))
        ));
        assert!(matches!(
            service.set_job_id(" ", "59").await,
            Err(FloconError::BadInput(_))
        ));
    }

    #[tokio::test]
    async fn sync_without_connection_reports_it() {
        let mut engagements = MockEngagementRepo::new();
        engagements
            .expect_find_by_id()
            .returning(|_| Ok(Some(project("e1", Some("1290"), None))));
        engagements.expect_find_primary_customer_party().returning(|_| {
            Ok(Some(EngagementParty {
                engagement_id: "e1".into(),
                party_id: "c1".into(),
                party_type: "company".into(),
                role: "customer".into(),
                is_primary: Some(true),
            }))
        });
        let mut companies = MockCompanyRepo::new();
        companies.expect_find_by_id().returning(|_| {
            Ok(Some(Company {
                id: "c1".into(),
                name: "Acme Homes".into(),
                ..Default::default()
            }))
        });

        let service = EngagementSyncService::new(Arc::new(engagements), Arc::new(companies), disconnected());
        let result = service.sync_engagement("e1", true).await;
        assert_eq!(
            result.error.as_deref(),
            Some("Not connected to QuickBooks. Please authorize first.")
        );
    }
}
