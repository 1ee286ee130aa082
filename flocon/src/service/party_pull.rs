//! Pulls vendors, customers and subcontractors from QuickBooks into the companies table
use crate::error::FloconError;
use crate::repository::company_repository::CompanyRepository;
use crate::service::token::TokenService;
use crate::types::{Company, CompanyUpdate, NewCompany, PullAction, PullResult, PulledParty};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use qbo::models::customer::Customer;
use qbo::models::vendor::Vendor;
use std::fmt;
use std::sync::Arc;

/// The kind of party being pulled decides which flag is set on the company and how much
/// of the QuickBooks record is copied onto a company matched by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyKind {
    Vendor,
    Customer,
    Subcontractor,
}

impl PartyKind {
    #[must_use]
    pub fn company_type(self) -> &'static str {
        match self {
            PartyKind::Vendor => "Vendor",
            PartyKind::Customer => "Contractor",
            PartyKind::Subcontractor => "Subcontractor",
        }
    }

    fn linked_action(self) -> PullAction {
        match self {
            PartyKind::Vendor => PullAction::Updated,
            PartyKind::Customer | PartyKind::Subcontractor => PullAction::Linked,
        }
    }

    fn flag(self, update: &mut CompanyUpdate) {
        match self {
            PartyKind::Vendor => update.is_vendor = Some(true),
            PartyKind::Customer => update.is_customer = Some(true),
            PartyKind::Subcontractor => update.is_subcontractor = Some(true),
        }
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartyKind::Vendor => "vendor",
            PartyKind::Customer => "customer",
            PartyKind::Subcontractor => "subcontractor",
        };
        f.write_str(name)
    }
}

/// The parts of a QuickBooks vendor or customer copied into a company
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QboParty {
    pub qbo_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&Vendor> for QboParty {
    fn from(vendor: &Vendor) -> Self {
        QboParty {
            qbo_id: vendor.id.clone(),
            name: vendor.name().map(ToString::to_string),
            email: vendor.email().map(ToString::to_string),
            phone: vendor.phone().map(ToString::to_string),
        }
    }
}

impl From<&Customer> for QboParty {
    fn from(customer: &Customer) -> Self {
        QboParty {
            qbo_id: customer.id().to_string(),
            name: customer.name().map(ToString::to_string),
            email: customer.email().map(ToString::to_string),
            phone: customer.phone().map(ToString::to_string),
        }
    }
}

pub struct PartyPullService {
    companies: Arc<dyn CompanyRepository>,
    tokens: Arc<TokenService>,
}

impl PartyPullService {
    pub fn new(companies: Arc<dyn CompanyRepository>, tokens: Arc<TokenService>) -> Self {
        Self { companies, tokens }
    }

    pub async fn pull_vendors(&self) -> PullResult {
        self.pull(PartyKind::Vendor).await
    }

    /// Top level customers only, jobs are left alone
    pub async fn pull_customers(&self) -> PullResult {
        self.pull(PartyKind::Customer).await
    }

    /// Vendors tracked for 1099
    pub async fn pull_subcontractors(&self) -> PullResult {
        self.pull(PartyKind::Subcontractor).await
    }

    pub async fn pull(&self, kind: PartyKind) -> PullResult {
        let parties = match self.list(kind).await {
            Ok(parties) => parties,
            Err(e) => {
                error!("Error pulling {kind}s from QuickBooks: {e}");
                return PullResult::failed(e.to_string());
            }
        };
        info!("Found {} {kind}s in QuickBooks", parties.len());
        self.import(kind, &parties).await
    }

    async fn list(&self, kind: PartyKind) -> Result<Vec<QboParty>, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        Ok(match kind {
            PartyKind::Vendor => client.list_vendors().await?.iter().map(QboParty::from).collect(),
            PartyKind::Subcontractor => client
                .list_vendors()
                .await?
                .iter()
                .filter(|v| v.is_subcontractor())
                .map(QboParty::from)
                .collect(),
            PartyKind::Customer => client
                .list_customers()
                .await?
                .iter()
                .filter(|c| c.is_top_level())
                .map(QboParty::from)
                .collect(),
        })
    }

    /// Writes the parties to the companies table, one at a time. A party that can not be
    /// written is counted as skipped.
    pub async fn import(&self, kind: PartyKind, parties: &[QboParty]) -> PullResult {
        let mut result = PullResult {
            success: true,
            total: parties.len(),
            ..Default::default()
        };

        for party in parties {
            let Some(name) = party.name.as_deref() else {
                debug!("Skipping {kind} {} - no name", party.qbo_id);
                result.skipped += 1;
                continue;
            };
            match self.import_one(kind, party, name).await {
                Ok(action) => {
                    info!("{action:?}: {name}");
                    match action {
                        PullAction::Created => result.created += 1,
                        PullAction::Updated | PullAction::Linked => result.updated += 1,
                    }
                    result.vendors.push(PulledParty {
                        name: name.to_string(),
                        qbo_id: party.qbo_id.clone(),
                        action,
                    });
                }
                Err(e) => {
                    warn!("Error processing {kind} {name}: {e}");
                    result.skipped += 1;
                }
            }
        }
        info!(
            "{kind} pull complete: {} created, {} updated, {} skipped",
            result.created, result.updated, result.skipped
        );
        result
    }

    async fn import_one(&self, kind: PartyKind, party: &QboParty, name: &str) -> Result<PullAction, FloconError> {
        let now = Utc::now();

        if let Some(existing) = self.companies.find_by_qbo_id(&party.qbo_id).await.ok().flatten() {
            let update = known_company_update(kind, party, name, now);
            self.companies.update(&existing.id, &update).await?;
            return Ok(PullAction::Updated);
        }

        if let Some(existing) = self.companies.find_by_name_ignore_case(name).await.ok().flatten() {
            let update = linked_company_update(kind, party, name, now);
            self.link(&existing, &update).await?;
            return Ok(kind.linked_action());
        }

        let mut company = NewCompany {
            name: name.to_string(),
            company_type: kind.company_type().to_string(),
            email: party.email.clone(),
            phone: party.phone.clone(),
            qbo_id: party.qbo_id.clone(),
            qbo_last_synced_at: now,
            ..Default::default()
        };
        match kind {
            PartyKind::Vendor => company.is_vendor = Some(true),
            PartyKind::Customer => company.is_customer = Some(true),
            PartyKind::Subcontractor => company.is_subcontractor = Some(true),
        }
        self.companies.insert(&company).await?;
        Ok(PullAction::Created)
    }

    async fn link(&self, company: &Company, update: &CompanyUpdate) -> Result<(), FloconError> {
        debug!("Linking company {} to QuickBooks id {:?}", company.id, update.qbo_id);
        self.companies.update(&company.id, update).await
    }
}

/// Refreshes a company already linked by `qbo_id`
fn known_company_update(kind: PartyKind, party: &QboParty, name: &str, now: DateTime<Utc>) -> CompanyUpdate {
    let mut update = CompanyUpdate {
        name: Some(name.to_string()),
        email: party.email.clone(),
        phone: party.phone.clone(),
        qbo_last_synced_at: Some(now),
        ..Default::default()
    };
    kind.flag(&mut update);
    update
}

/// Links a company matched by name to its QuickBooks record
fn linked_company_update(kind: PartyKind, party: &QboParty, name: &str, now: DateTime<Utc>) -> CompanyUpdate {
    let mut update = CompanyUpdate {
        qbo_id: Some(party.qbo_id.clone()),
        qbo_last_synced_at: Some(now),
        ..Default::default()
    };
    kind.flag(&mut update);
    match kind {
        PartyKind::Vendor => {
            update.email.clone_from(&party.email);
            update.phone.clone_from(&party.phone);
        }
        PartyKind::Customer => {
            update.name = Some(name.to_string());
            update.email.clone_from(&party.email);
            update.phone.clone_from(&party.phone);
        }
        PartyKind::Subcontractor => {}
    }
    update
}
