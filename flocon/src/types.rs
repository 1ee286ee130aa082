//! Rows of the FloCon database and the results reported by the sync operations.
//!
//! Row types mirror the columns the sync layer reads; unknown columns are ignored.
//! Result types are serialized in camelCase, which is what the HTTP API returns.
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

pub const ENGAGEMENTS: &str = "engagements";
pub const ENGAGEMENT_PARTIES: &str = "engagement_parties";
pub const COMPANIES: &str = "companies";
pub const PAY_APPS: &str = "engagement_pay_apps";
pub const QBO_TOKENS: &str = "qbo_tokens";
pub const MIGRATION_HISTORY: &str = "migration_history";
pub const QBO_COST_CACHE: &str = "qbo_cost_cache";

pub const ROLE_CUSTOMER: &str = "customer";
pub const PARTY_TYPE_COMPANY: &str = "company";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngagementType {
    Prospect,
    #[default]
    Project,
}

impl EngagementType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EngagementType::Prospect => "prospect",
            EngagementType::Project => "project",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Engagement {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub project_number: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: EngagementType,
    #[serde(default)]
    pub qbo_customer_id: Option<String>,
    #[serde(default)]
    pub qbo_job_id: Option<String>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub qbo_last_synced_at: Option<DateTime<Utc>>,
}

impl Engagement {
    /// The project number, if it is set to something
    #[must_use]
    pub fn project_number(&self) -> Option<&str> {
        self.project_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.qbo_job_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

/// Links between an engagement and a company or contact
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngagementParty {
    pub engagement_id: String,
    pub party_id: String,
    pub party_type: String,
    pub role: String,
    #[serde(default)]
    pub is_primary: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company_type: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_customer: Option<bool>,
    #[serde(default)]
    pub is_vendor: Option<bool>,
    #[serde(default)]
    pub is_subcontractor: Option<bool>,
    #[serde(default)]
    pub qbo_id: Option<String>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub qbo_last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct NewCompany {
    pub name: String,
    pub company_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_customer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_vendor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_subcontractor: Option<bool>,
    pub qbo_id: String,
    pub qbo_last_synced_at: DateTime<Utc>,
}

/// Columns to change on a company; `None` leaves the column alone
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CompanyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_customer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_vendor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_subcontractor: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QboSyncStatus {
    Synced,
    Error,
}

/// A payment application, pushed to QuickBooks as an invoice
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PayApp {
    pub id: String,
    pub engagement_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub pay_app_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub current_payment_due: Option<f64>,
    #[serde(default)]
    pub period_end: Option<NaiveDate>,
    #[serde(default)]
    pub date_submitted: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub qbo_invoice_id: Option<String>,
    #[serde(default)]
    pub qbo_sync_status: Option<QboSyncStatus>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub qbo_synced_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub qbo_sync_error: Option<String>,
    #[serde(default)]
    pub qbo_payment_total: Option<f64>,
}

impl PayApp {
    #[must_use]
    pub fn pay_app_number(&self) -> Option<&str> {
        self.pay_app_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// The amount billed: the current payment due, else the pay app amount
    #[must_use]
    pub fn billed_amount(&self) -> f64 {
        self.current_payment_due
            .filter(|a| *a != 0.0)
            .or(self.amount)
            .unwrap_or_default()
    }
}

/// Columns to change on a pay app.
///
/// `qbo_sync_error` is doubly optional: `Some(None)` writes `null`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PayAppUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_sync_status: Option<QboSyncStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_synced_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_sync_error: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_payment_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PayAppUpdate {
    #[must_use]
    pub fn synced(invoice_id: &str, at: DateTime<Utc>) -> Self {
        PayAppUpdate {
            qbo_invoice_id: Some(invoice_id.to_string()),
            qbo_sync_status: Some(QboSyncStatus::Synced),
            qbo_synced_at: Some(at),
            qbo_sync_error: Some(None),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn failed(error: &str) -> Self {
        PayAppUpdate {
            qbo_sync_status: Some(QboSyncStatus::Error),
            qbo_sync_error: Some(Some(error.to_string())),
            ..Default::default()
        }
    }
}

/// Payment status derived from the invoice balance in QuickBooks
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Partial,
    Submitted,
}

impl PaymentStatus {
    #[must_use]
    pub fn from_balance(balance: f64, payment_total: f64) -> Self {
        if balance == 0.0 {
            PaymentStatus::Paid
        } else if payment_total > 0.0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Submitted
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Partial => "Partial",
            PaymentStatus::Submitted => "Submitted",
        }
    }
}

/// OAuth tokens for one connected QuickBooks company
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QboToken {
    #[serde(default)]
    pub id: Option<String>,
    pub realm_id: String,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(deserialize_with = "timestamp")]
    pub expires_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp")]
    pub refresh_expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub connected_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_timestamp")]
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

/// The columns written when tokens are saved, keyed on `realm_id`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenUpsert {
    pub realm_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub scope: Option<String>,
    pub is_active: bool,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    pub filename: String,
    /// As stored; older databases keep this without a time zone
    #[serde(default)]
    pub executed_at: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

/// Job costs of one engagement as last fetched from QuickBooks, keyed on `engagement_id`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CostCacheEntry {
    pub engagement_id: String,
    pub qbo_job_id: String,
    #[serde(default, deserialize_with = "number")]
    pub bills_total: f64,
    #[serde(default, deserialize_with = "number")]
    pub purchases_total: f64,
    #[serde(default, deserialize_with = "number")]
    pub payroll_total: f64,
    #[serde(default, deserialize_with = "number")]
    pub credits_total: f64,
    #[serde(default, deserialize_with = "number")]
    pub net_cost_to_date: f64,
    #[serde(default)]
    pub bills_count: i64,
    #[serde(default)]
    pub purchases_count: i64,
    #[serde(default)]
    pub payroll_count: i64,
    #[serde(default)]
    pub credits_count: i64,
    #[serde(deserialize_with = "timestamp")]
    pub last_synced_at: DateTime<Utc>,
}

// -----------------------
// Results

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncResult {
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        SyncResult {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Tallies of [`SyncResult`]s over a list of engagements
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct MultiSyncResult {
    pub success: usize,
    pub failed: usize,
    pub results: Vec<SyncResult>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSyncResult {
    pub project_id: String,
    pub project_number: Option<String>,
    pub name: String,
    #[serde(flatten)]
    pub result: SyncResult,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PayAppSyncResult {
    pub pay_app_id: String,
    #[serde(flatten)]
    pub result: InvoiceSyncResult,
}

/// Outcome of running one operation over many records
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T> {
    pub success: bool,
    pub synced_count: usize,
    pub error_count: usize,
    pub total_count: usize,
    pub results: Vec<T>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        BatchResult {
            success: true,
            synced_count: 0,
            error_count: 0,
            total_count: 0,
            results: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    pub fn record(&mut self, result: T, success: bool) {
        if success {
            self.synced_count += 1;
        } else {
            self.error_count += 1;
        }
        self.total_count += 1;
        self.success = self.error_count == 0;
        self.results.push(result);
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSyncResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InvoiceSyncResult {
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        InvoiceSyncResult {
            success: false,
            invoice_id: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentResult {
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        PaymentResult {
            success: false,
            payment_total: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PullAction {
    Created,
    Updated,
    Linked,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PulledParty {
    pub name: String,
    pub qbo_id: String,
    pub action: PullAction,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PullResult {
    pub success: bool,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Every record that was written, whatever the kind of party pulled
    pub vendors: Vec<PulledParty>,
}

impl PullResult {
    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        PullResult {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    DocNumber,
    AmountAndDate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceMatch {
    #[serde(skip)]
    pub pay_app_id: String,
    pub pay_app_number: String,
    #[serde(skip)]
    pub invoice_id: String,
    pub invoice_doc_number: String,
    pub match_type: MatchType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedPayApp {
    pub pay_app_id: String,
    pub pay_app_number: String,
    pub amount: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkError {
    pub pay_app_id: String,
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinkInvoicesResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Pay apps actually updated with an invoice id
    pub matched: usize,
    pub total: usize,
    pub matches: Vec<InvoiceMatch>,
    pub unmatched: Vec<UnmatchedPayApp>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<LinkError>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realm_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_expires_at: Option<DateTime<Utc>>,
    pub access_token_expired: bool,
    pub refresh_token_expired: bool,
    pub needs_reauthorization: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub project_number: Option<String>,
    pub name: String,
    pub qbo_customer_id: Option<String>,
    pub qbo_job_id: Option<String>,
    pub qbo_last_synced_at: Option<DateTime<Utc>>,
}

impl From<&Engagement> for ProjectSummary {
    fn from(engagement: &Engagement) -> Self {
        ProjectSummary {
            id: engagement.id.clone(),
            project_number: engagement.project_number.clone(),
            name: engagement.name.clone(),
            qbo_customer_id: engagement.qbo_customer_id.clone(),
            qbo_job_id: engagement.qbo_job_id.clone(),
            qbo_last_synced_at: engagement.qbo_last_synced_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusReport {
    pub total: usize,
    pub synced: usize,
    pub unsynced: usize,
    pub unsynced_projects: Vec<ProjectSummary>,
    pub recently_synced: Vec<ProjectSummary>,
}

/// Costs booked against one QuickBooks job
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCosts {
    pub bills_total: f64,
    pub purchases_total: f64,
    pub journal_entries_total: f64,
    pub time_activity_total: f64,
    pub payroll_total: f64,
    pub credits_total: f64,
    pub net_cost_to_date: f64,
    pub transaction_count: usize,
    pub last_updated: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PayrollCosts {
    pub payroll_total: f64,
    pub paycheck_count: usize,
    pub last_updated: DateTime<Utc>,
}

/// Payroll found in the books rather than through the payroll API
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LedgerPayroll {
    pub payroll_total: f64,
    pub accounts_checked: Vec<String>,
    pub transactions_found: usize,
    pub method: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfitLossSummary {
    pub income: f64,
    pub cogs: f64,
    pub expenses: f64,
    pub net_income: f64,
    pub income_accounts: Vec<String>,
    pub expense_accounts: Vec<String>,
    pub method: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CachedProjectCosts {
    pub bills_total: f64,
    pub purchases_total: f64,
    pub payroll_total: f64,
    pub credits_total: f64,
    pub net_cost_to_date: f64,
    pub bills_count: i64,
    pub purchases_count: i64,
    pub payroll_count: i64,
    pub credits_count: i64,
    pub cached: bool,
    pub last_synced: Option<DateTime<Utc>>,
}

impl CachedProjectCosts {
    #[must_use]
    pub fn from_entry(entry: &CostCacheEntry, cached: bool) -> Self {
        CachedProjectCosts {
            bills_total: entry.bills_total,
            purchases_total: entry.purchases_total,
            payroll_total: entry.payroll_total,
            credits_total: entry.credits_total,
            net_cost_to_date: entry.net_cost_to_date,
            bills_count: entry.bills_count,
            purchases_count: entry.purchases_count,
            payroll_count: entry.payroll_count,
            credits_count: entry.credits_count,
            cached,
            last_synced: Some(entry.last_synced_at),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImportOutcome {
    Created,
    Duplicate,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportedVendor {
    pub name: String,
    pub outcome: ImportOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qbo_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VendorImportResult {
    pub total: usize,
    pub created: usize,
    pub skipped: usize,
    pub errors: usize,
    pub project_vendors: usize,
    pub results: Vec<ImportedVendor>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BackfilledCompany {
    pub company_id: String,
    pub name: String,
    pub qbo_id: String,
}

/// Outcome of copying customer ids from linked engagements onto their companies
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResult {
    pub engagements: usize,
    pub companies: usize,
    pub updated: Vec<BackfilledCompany>,
    /// Companies that already had a QuickBooks id
    pub already_linked: usize,
    /// Engagements without a company as primary customer
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// Parses `timestamptz` as well as `timestamp` columns, the latter taken to be UTC
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z")
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
}

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'")))
}

fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{raw}'"))),
        None => Ok(None),
    }
}

/// Accepts text as well as numeric columns, i.e. a `pay_app_number` stored as an integer
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => Some(s),
        Some(Raw::Int(i)) => Some(i.to_string()),
        Some(Raw::Float(f)) => Some(f.to_string()),
        None => None,
    })
}

/// `numeric` columns arrive as JSON numbers or, for large precision, as text
fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Ok(n),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid number '{s}'"))),
        None => Ok(0.0),
    }
}
