//! Job costing: what QuickBooks has booked against a project's job, read from the cost
//! transactions and from the payroll and profit and loss reports.
use crate::error::FloconError;
use crate::repository::cost_cache_repository::CostCacheRepository;
use crate::service::token::TokenService;
use crate::types::{
    CachedProjectCosts, CostCacheEntry, LedgerPayroll, PayrollCosts, ProfitLossSummary,
    ProjectCosts,
};
use chrono::{Duration, NaiveDate, Utc};
use log::{debug, error, info, warn};
use qbo::models::report::{amount, Report, Row};
use qbo::models::transaction::{
    ExpenseKind, ExpenseTransaction, JournalEntry, Paycheck, TimeActivity,
};
use qbo::QuickBooks;
use std::sync::Arc;

/// Cached costs younger than this are served without asking QuickBooks
pub const CACHE_TTL_MINUTES: i64 = 60;

pub const TRANSACTION_LIST_METHOD: &str = "TransactionList_PayrollCheck";
pub const GENERAL_LEDGER_METHOD: &str = "GeneralLedger_PayrollCheck";
pub const PROFIT_AND_LOSS_CASH_METHOD: &str = "ProfitAndLoss_Cash";

const PAYROLL_CHECK: &str = "Payroll Check";

/// Credits to these accounts are the other side of a paycheck, not a cost
const CASH_OR_LIABILITY: [&str; 7] = [
    "cash",
    "checking",
    "savings",
    "bank",
    "payable",
    "liability",
    "payroll liabilities",
];

const INCOME_WORDS: [&str; 3] = ["income", "revenue", "sales"];

const EXPENSE_KEYWORDS: [&str; 47] = [
    "cost of goods",
    "cogs",
    "materials",
    "labor",
    "equipment",
    "supplies",
    "freight",
    "shipping",
    "concrete",
    "steel",
    "lumber",
    "electrical",
    "plumbing",
    "hvac",
    "roofing",
    "flooring",
    "drywall",
    "painting",
    "landscaping",
    "excavation",
    "grading",
    "foundation",
    "framing",
    "insulation",
    "windows",
    "doors",
    "cabinets",
    "countertops",
    "appliances",
    "fixtures",
    "tile",
    "carpet",
    "hardwood",
    "siding",
    "gutters",
    "fencing",
    "irrigation",
    "sprinklers",
    "decks and patios",
    "pest control",
    "wages",
    "salaries",
    "payroll",
    "benefits",
    "reimbursements",
    "travel expense",
    "subcontractors",
];

/// Transaction dates to report on, both ends inclusive. Open ends default to all time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateRange {
    fn default() -> Self {
        DateRange {
            start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

impl DateRange {
    #[must_use]
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let all_time = DateRange::default();
        DateRange {
            start: start.unwrap_or(all_time.start),
            end: end.unwrap_or(all_time.end),
        }
    }
}

pub struct CostReportService {
    cost_cache: Arc<dyn CostCacheRepository>,
    tokens: Arc<TokenService>,
}

impl CostReportService {
    pub fn new(cost_cache: Arc<dyn CostCacheRepository>, tokens: Arc<TokenService>) -> Self {
        Self { cost_cache, tokens }
    }

    /// Bills, purchases, journal entry debits, time and payroll booked against the job,
    /// less vendor credits. Payroll that can not be read counts as zero.
    ///
    /// # Errors
    /// `NotConnected` without tokens, otherwise the error of any failed transaction query
    pub async fn project_costs(&self, job_id: &str, range: DateRange) -> Result<ProjectCosts, FloconError> {
        let client = self.tokens.authenticated_client().await?;

        let (bills_total, bills) =
            expense_total(&fetch_expenses(&client, ExpenseKind::Bill, range).await?, job_id);
        let (purchases_total, purchases) =
            expense_total(&fetch_expenses(&client, ExpenseKind::Purchase, range).await?, job_id);
        let (journal_entries_total, journal_lines) = journal_total(
            &client
                .transactions_between::<JournalEntry>(range.start, range.end)
                .await?,
            job_id,
        );
        let (time_activity_total, time_entries) = time_total(
            &client
                .transactions_between::<TimeActivity>(range.start, range.end)
                .await?,
            job_id,
        );
        let (credits_total, credits) = expense_total(
            &fetch_expenses(&client, ExpenseKind::VendorCredit, range).await?,
            job_id,
        );

        let payroll_total = match ledger_payroll(&client, job_id, range).await {
            Ok(payroll) => payroll.payroll_total,
            Err(e) => {
                warn!("Unable to read payroll of job {job_id}, counting it as zero: {e}");
                0.0
            }
        };

        let net_cost_to_date = bills_total
            + purchases_total
            + journal_entries_total
            + time_activity_total
            + payroll_total
            - credits_total;
        debug!("Job {job_id} costs {net_cost_to_date} to date");

        Ok(ProjectCosts {
            bills_total,
            purchases_total,
            journal_entries_total,
            time_activity_total,
            payroll_total,
            credits_total,
            net_cost_to_date,
            transaction_count: bills + purchases + journal_lines + time_entries + credits,
            last_updated: Utc::now(),
        })
    }

    /// Job coded earnings on paychecks, through the payroll API
    ///
    /// # Errors
    /// `PayrollNotAuthorized` when neither paycheck endpoint answers
    pub async fn payroll_costs(&self, job_id: &str, range: DateRange) -> Result<PayrollCosts, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        let paychecks = client
            .paychecks_between(range.start, range.end)
            .await
            .map_err(|e| {
                error!("Payroll API access not available: {e}");
                FloconError::PayrollNotAuthorized
            })?;
        let (payroll_total, paycheck_count) = paycheck_total(&paychecks, job_id);
        Ok(PayrollCosts {
            payroll_total,
            paycheck_count,
            last_updated: Utc::now(),
        })
    }

    /// Payroll checks booked against the job, from the transaction list, or from the
    /// general ledger when the transaction list can not be read
    ///
    /// # Errors
    /// `NotConnected` without tokens, otherwise the error of the general ledger report
    pub async fn payroll_from_ledger(&self, job_id: &str, range: DateRange) -> Result<LedgerPayroll, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        ledger_payroll(&client, job_id, range).await
    }

    /// Total of the cost of goods and expense accounts on the job's cash basis
    /// profit and loss
    ///
    /// # Errors
    /// `NotConnected` without tokens, otherwise the error of the report
    pub async fn cash_costs(&self, job_id: &str, range: DateRange) -> Result<LedgerPayroll, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        let report = client
            .cash_profit_and_loss(job_id, range.start, range.end)
            .await?;
        Ok(expense_accounts_total(&report))
    }

    /// Income, cost of goods and expenses of the job's cash basis profit and loss
    ///
    /// # Errors
    /// `NotConnected` without tokens, otherwise the error of the report
    pub async fn profit_loss(&self, job_id: &str, range: DateRange) -> Result<ProfitLossSummary, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        let report = client
            .cash_profit_and_loss(job_id, range.start, range.end)
            .await?;
        Ok(summarize_profit_loss(&report))
    }

    /// Project costs served from the cost cache while they are fresh, refetched from the
    /// ledger otherwise. A failing cache is logged and bypassed.
    ///
    /// # Errors
    /// `NotConnected` without tokens, otherwise the error of the payroll reports
    pub async fn cached_project_costs(
        &self,
        engagement_id: &str,
        job_id: &str,
        force_refresh: bool,
    ) -> Result<CachedProjectCosts, FloconError> {
        if !force_refresh {
            match self.cost_cache.find(engagement_id).await {
                Ok(Some(entry)) if Utc::now() - entry.last_synced_at < Duration::minutes(CACHE_TTL_MINUTES) => {
                    debug!("Serving cached costs of engagement {engagement_id}");
                    return Ok(CachedProjectCosts::from_entry(&entry, true));
                }
                Ok(_) => {}
                Err(e) => error!("Error reading cost cache of {engagement_id}: {e}"),
            }
        }

        info!("Fetching costs of job {job_id} for engagement {engagement_id}");
        let payroll = self.payroll_from_ledger(job_id, DateRange::default()).await?;
        let entry = CostCacheEntry {
            engagement_id: engagement_id.to_string(),
            qbo_job_id: job_id.to_string(),
            bills_total: 0.0,
            purchases_total: 0.0,
            payroll_total: 0.0,
            credits_total: 0.0,
            net_cost_to_date: payroll.payroll_total,
            bills_count: 0,
            purchases_count: 0,
            payroll_count: 0,
            credits_count: i64::try_from(payroll.transactions_found).unwrap_or(i64::MAX),
            last_synced_at: Utc::now(),
        };
        if let Err(e) = self.cost_cache.upsert(&entry).await {
            warn!("Error caching costs of {engagement_id}: {e}");
        }
        Ok(CachedProjectCosts::from_entry(&entry, false))
    }
}

async fn fetch_expenses(
    client: &QuickBooks,
    kind: ExpenseKind,
    range: DateRange,
) -> Result<Vec<ExpenseTransaction>, FloconError> {
    Ok(client.expenses_between(kind, range.start, range.end).await?)
}

async fn ledger_payroll(client: &QuickBooks, job_id: &str, range: DateRange) -> Result<LedgerPayroll, FloconError> {
    match client.transaction_list(job_id, range.start, range.end).await {
        Ok(report) => {
            let (payroll_total, transactions_found) =
                payroll_checks(&report.rows.row, job_id, &TRANSACTION_LIST_COLUMNS);
            return Ok(LedgerPayroll {
                payroll_total,
                accounts_checked: vec!["TransactionList".to_string()],
                transactions_found,
                method: TRANSACTION_LIST_METHOD.to_string(),
            });
        }
        Err(e) => info!("TransactionList failed, trying GeneralLedger: {e}"),
    }

    let report = client.general_ledger(range.start, range.end).await?;
    let (payroll_total, transactions_found) =
        payroll_checks(&report.rows.row, job_id, &GENERAL_LEDGER_COLUMNS);
    Ok(LedgerPayroll {
        payroll_total,
        accounts_checked: vec!["GeneralLedger".to_string()],
        transactions_found,
        method: GENERAL_LEDGER_METHOD.to_string(),
    })
}

/// Sum and number of the expense lines billed to the job
fn expense_total(transactions: &[ExpenseTransaction], job_id: &str) -> (f64, usize) {
    transactions
        .iter()
        .flat_map(|t| t.line.iter())
        .filter(|line| line.customer_id() == Some(job_id))
        .fold((0.0, 0), |(total, count), line| {
            (total + line.amount.unwrap_or_default(), count + 1)
        })
}

fn journal_total(entries: &[JournalEntry], job_id: &str) -> (f64, usize) {
    entries
        .iter()
        .flat_map(|e| e.line.iter())
        .filter(|line| line.is_debit_to(job_id))
        .fold((0.0, 0), |(total, count), line| {
            (total + line.amount.unwrap_or_default(), count + 1)
        })
}

fn time_total(activities: &[TimeActivity], job_id: &str) -> (f64, usize) {
    activities
        .iter()
        .filter(|a| a.customer_ref.as_ref().is_some_and(|r| r.value == job_id))
        .fold((0.0, 0), |(total, count), a| (total + a.cost(), count + 1))
}

/// Sum of the job coded earnings and the number of paychecks carrying any
fn paycheck_total(paychecks: &[Paycheck], job_id: &str) -> (f64, usize) {
    paychecks.iter().fold((0.0, 0), |(total, count), paycheck| {
        let mut job_earnings = paycheck.earnings.iter().filter(|e| e.is_for(job_id)).peekable();
        if job_earnings.peek().is_none() {
            return (total, count);
        }
        let sum: f64 = job_earnings.map(|e| e.amount.unwrap_or_default()).sum();
        (total + sum, count + 1)
    })
}

/// Where a payroll report keeps the cells of a transaction row
struct LedgerColumns {
    customer: usize,
    account: usize,
    /// Used when the row has no `account` cell
    fallback_account: Option<usize>,
    /// `None` is the last column
    amount: Option<usize>,
    nested: bool,
}

const TRANSACTION_LIST_COLUMNS: LedgerColumns = LedgerColumns {
    customer: 4,
    account: 5,
    fallback_account: Some(6),
    amount: None,
    nested: false,
};

const GENERAL_LEDGER_COLUMNS: LedgerColumns = LedgerColumns {
    customer: 3,
    account: 0,
    fallback_account: None,
    amount: Some(6),
    nested: true,
};

/// Sum and number of the payroll checks booked to the job, skipping the cash and
/// liability side of each check
fn payroll_checks(rows: &[Row], job_id: &str, columns: &LedgerColumns) -> (f64, usize) {
    let mut total = 0.0;
    let mut found = 0;
    for row in rows {
        if row.is_data() && row.value(1) == PAYROLL_CHECK {
            let customer = row.col_data.get(columns.customer);
            let customer_id = customer.and_then(|c| c.id.as_deref()).unwrap_or_default();
            let customer_name = customer.map_or("", |c| c.value.as_str());

            let account_index = match columns.fallback_account {
                Some(fallback) if row.col_data.len() <= columns.account => fallback,
                _ => columns.account,
            };
            let account = row.value(account_index).to_lowercase();
            let is_cash_or_liability = CASH_OR_LIABILITY.iter().any(|word| account.contains(word));

            let matches_job = customer_id == job_id || customer_name.contains(job_id);
            if !is_cash_or_liability && matches_job {
                let cell = match columns.amount {
                    Some(index) => row.value(index),
                    None => row.col_data.last().map_or("", |c| c.value.as_str()),
                };
                let value = amount(cell).abs();
                debug!("Found payroll check: {value} for {customer_name} ({account})");
                total += value;
                found += 1;
            }
        }
        if columns.nested {
            let (nested_total, nested_found) = payroll_checks(row.children(), job_id, columns);
            total += nested_total;
            found += nested_found;
        }
    }
    (total, found)
}

/// Cost of goods and expense accounts, told apart by a 5 or 6 leading account number,
/// otherwise by name
fn is_expense_account(name: &str) -> bool {
    let digits = name.chars().take_while(char::is_ascii_digit).count();
    if digits >= 5 {
        return name.starts_with('5') || name.starts_with('6');
    }
    let lower = name.to_lowercase();
    if INCOME_WORDS.iter().any(|word| lower.contains(word)) {
        return false;
    }
    EXPENSE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

fn remember(accounts: &mut Vec<String>, name: &str) {
    if !accounts.iter().any(|a| a == name) {
        accounts.push(name.to_string());
    }
}

fn expense_accounts_total(report: &Report) -> LedgerPayroll {
    fn walk(rows: &[Row], total: &mut f64, accounts: &mut Vec<String>) {
        for row in rows {
            if let Some(header) = &row.header {
                let title = header.value(0);
                if title.to_lowercase().contains("income") {
                    continue;
                }
                let header_amount = amount(header.value(1));
                if header_amount != 0.0 && is_expense_account(title) {
                    *total += header_amount.abs();
                    remember(accounts, title);
                }
                walk(row.children(), total, accounts);
                continue;
            }
            if row.summary.is_some() {
                continue;
            }
            let name = row.value(0);
            if !name.is_empty() {
                let value = amount(row.value(1));
                if value != 0.0 && is_expense_account(name) {
                    *total += value.abs();
                    remember(accounts, name);
                }
            }
            walk(row.children(), total, accounts);
        }
    }

    let mut total = 0.0;
    let mut accounts = Vec::new();
    walk(&report.rows.row, &mut total, &mut accounts);
    LedgerPayroll {
        payroll_total: total,
        transactions_found: accounts.len(),
        accounts_checked: accounts,
        method: PROFIT_AND_LOSS_CASH_METHOD.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Income,
    Cogs,
    Expenses,
    Other,
}

impl Section {
    fn of(title: &str) -> Self {
        let title = title.to_lowercase();
        if title.contains("income") || title.contains("revenue") {
            Section::Income
        } else if title.contains("cost of goods") || title.contains("cogs") {
            Section::Cogs
        } else if title.contains("expense") {
            Section::Expenses
        } else {
            Section::Other
        }
    }
}

fn summarize_profit_loss(report: &Report) -> ProfitLossSummary {
    fn add(summary: &mut ProfitLossSummary, section: Section, name: &str, value: f64) {
        if value == 0.0 {
            return;
        }
        match section {
            Section::Income => {
                summary.income += value.abs();
                remember(&mut summary.income_accounts, name);
            }
            Section::Cogs => {
                summary.cogs += value.abs();
                remember(&mut summary.expense_accounts, name);
            }
            Section::Expenses => {
                summary.expenses += value.abs();
                remember(&mut summary.expense_accounts, name);
            }
            Section::Other => {}
        }
    }

    fn walk(rows: &[Row], section: Section, summary: &mut ProfitLossSummary) {
        for row in rows {
            if let Some(header) = &row.header {
                let title = header.value(0);
                let inner = Section::of(title);
                let name = if title.is_empty() { "Unknown" } else { title };
                add(summary, inner, name, amount(header.value(1)));
                walk(row.children(), inner, summary);
                continue;
            }
            if row.summary.is_some() {
                continue;
            }
            let name = row.value(0);
            if !name.is_empty() {
                add(summary, section, name, amount(row.value(1)));
            }
            walk(row.children(), section, summary);
        }
    }

    let mut summary = ProfitLossSummary {
        method: PROFIT_AND_LOSS_CASH_METHOD.to_string(),
        ..Default::default()
    };
    walk(&report.rows.row, Section::Other, &mut summary);
    summary.net_income = summary.income - summary.cogs - summary.expenses;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mocks::{disconnected, MockCostCacheRepo};

    fn report(json: &str) -> Report {
        serde_json::from_str(json).unwrap()
    }

    fn cache_entry(synced_minutes_ago: i64) -> CostCacheEntry {
        CostCacheEntry {
            engagement_id: "e1".into(),
            qbo_job_id: "88".into(),
            bills_total: 0.0,
            purchases_total: 0.0,
            payroll_total: 0.0,
            credits_total: 0.0,
            net_cost_to_date: 1234.0,
            bills_count: 0,
            purchases_count: 0,
            payroll_count: 0,
            credits_count: 2,
            last_synced_at: Utc::now() - Duration::minutes(synced_minutes_ago),
        }
    }

    const PROFIT_AND_LOSS: &str = r#"{"Rows": {"Row": [
        {"type": "Section", "Header": {"ColData": [{"value": "Income"}, {"value": ""}]},
         "Rows": {"Row": [{"type": "Data", "ColData": [{"value": "Construction Income"}, {"value": "10,000.00"}]}]},
         "Summary": {"ColData": [{"value": "Total Income"}, {"value": "10,000.00"}]}},
        {"type": "Section", "Header": {"ColData": [{"value": "Cost of Goods Sold"}, {"value": ""}]},
         "Rows": {"Row": [
            {"type": "Data", "ColData": [{"value": "51100 Job Materials"}, {"value": "2,500.00"}]},
            {"type": "Data", "ColData": [{"value": "Subcontractors"}, {"value": "(1,000.00)"}]}
         ]},
         "Summary": {"ColData": [{"value": "Total Cost of Goods Sold"}, {"value": "3,500.00"}]}},
        {"type": "Section", "Header": {"ColData": [{"value": "Expenses"}, {"value": ""}]},
         "Rows": {"Row": [
            {"type": "Data", "ColData": [{"value": "Wages"}, {"value": "800.00"}]},
            {"type": "Data", "ColData": [{"value": "Office Rent"}, {"value": "300.00"}]},
            {"type": "Data", "ColData": [{"value": "40100 Other Receipts"}, {"value": "50.00"}]}
         ]}},
        {"type": "Section", "Summary": {"ColData": [{"value": "Net Income"}, {"value": "5,350.00"}]}}
    ]}}"#;

    #[test]
    fn expense_accounts_by_number_then_by_name() {
        assert!(is_expense_account("51100 Job Materials"));
        assert!(is_expense_account("60200 Office"));
        assert!(!is_expense_account("40100 Lumber Sales"));
        assert!(!is_expense_account("Lumber Sales"));
        assert!(is_expense_account("Drywall & Paint"));
        assert!(is_expense_account("Decks and Patios"));
        assert!(!is_expense_account("Office Rent"));
        assert!(!is_expense_account(""));
    }

    #[test]
    fn cash_costs_skip_income_and_unknown_accounts() {
        let costs = expense_accounts_total(&report(PROFIT_AND_LOSS));
        assert_eq!(costs.payroll_total, 4300.0);
        assert_eq!(
            costs.accounts_checked,
            vec!["51100 Job Materials", "Subcontractors", "Wages"]
        );
        assert_eq!(costs.transactions_found, 3);
        assert_eq!(costs.method, PROFIT_AND_LOSS_CASH_METHOD);
    }

    #[test]
    fn profit_loss_is_split_by_section() {
        let summary = summarize_profit_loss(&report(PROFIT_AND_LOSS));
        assert_eq!(summary.income, 10000.0);
        assert_eq!(summary.cogs, 3500.0);
        assert_eq!(summary.expenses, 1150.0);
        assert_eq!(summary.net_income, 5350.0);
        assert_eq!(summary.income_accounts, vec!["Construction Income"]);
        assert_eq!(summary.expense_accounts.len(), 5);
    }

    #[test]
    fn transaction_list_counts_job_payroll_checks() {
        let rows = report(
            r#"{"Rows": {"Row": [
                {"type": "Data", "ColData": [{"value": "2024-03-01"}, {"value": "Payroll Check"}, {"value": "101"}, {"value": "J. Doe"},
                    {"value": "1290 Lakeside Remodel", "id": "88"}, {"value": "Job Wages"}, {"value": ""}, {"value": "-1,200.00"}]},
                {"type": "Data", "ColData": [{"value": "2024-03-01"}, {"value": "Payroll Check"}, {"value": "101"}, {"value": "J. Doe"},
                    {"value": "1290 Lakeside Remodel", "id": "88"}, {"value": "Business Checking"}, {"value": ""}, {"value": "1,200.00"}]},
                {"type": "Data", "ColData": [{"value": "2024-03-02"}, {"value": "Bill"}, {"value": ""}, {"value": "Supplier"},
                    {"value": "1290 Lakeside Remodel", "id": "88"}, {"value": "Materials"}, {"value": ""}, {"value": "500.00"}]},
                {"type": "Data", "ColData": [{"value": "2024-03-08"}, {"value": "Payroll Check"}, {"value": "102"}, {"value": "J. Doe"},
                    {"value": "1291 Harbor View", "id": "90"}, {"value": "Job Wages"}, {"value": ""}, {"value": "-700.00"}]}
            ]}}"#,
        );
        assert_eq!(
            payroll_checks(&rows.rows.row, "88", &TRANSACTION_LIST_COLUMNS),
            (1200.0, 1)
        );
    }

    #[test]
    fn general_ledger_checks_are_found_in_nested_sections() {
        let rows = report(
            r#"{"Rows": {"Row": [
                {"type": "Section", "Header": {"ColData": [{"value": "Job Wages"}]}, "Rows": {"Row": [
                    {"type": "Data", "ColData": [{"value": "Job Wages"}, {"value": "Payroll Check"}, {"value": "101"},
                        {"value": "Lakeside 88", "id": ""}, {"value": ""}, {"value": ""}, {"value": "950.00"}]}
                ]}},
                {"type": "Section", "Header": {"ColData": [{"value": "Payroll Liabilities"}]}, "Rows": {"Row": [
                    {"type": "Data", "ColData": [{"value": "Payroll Liabilities"}, {"value": "Payroll Check"}, {"value": "101"},
                        {"value": "Lakeside", "id": "88"}, {"value": ""}, {"value": ""}, {"value": "-120.00"}]}
                ]}}
            ]}}"#,
        );
        assert_eq!(
            payroll_checks(&rows.rows.row, "88", &GENERAL_LEDGER_COLUMNS),
            (950.0, 1)
        );
    }

    #[test]
    fn default_range_covers_all_time() {
        let range = DateRange::new(NaiveDate::from_ymd_opt(2024, 1, 1), None);
        assert_eq!(range.start.to_string(), "2024-01-01");
        assert_eq!(range.end.to_string(), "2099-12-31");
        assert_eq!(DateRange::default().start.to_string(), "2000-01-01");
    }

    #[tokio::test]
    async fn fresh_cache_is_served_without_quickbooks() {
        let mut cache = MockCostCacheRepo::new();
        cache.expect_find().returning(|_| Ok(Some(cache_entry(10))));
        cache.expect_upsert().never();

        let service = CostReportService::new(Arc::new(cache), disconnected());
        let costs = service.cached_project_costs("e1", "88", false).await.unwrap();
        assert!(costs.cached);
        assert_eq!(costs.net_cost_to_date, 1234.0);
        assert_eq!(costs.credits_count, 2);
    }

    #[tokio::test]
    async fn stale_or_forced_cache_goes_to_quickbooks() {
        let mut cache = MockCostCacheRepo::new();
        cache.expect_find().returning(|_| Ok(Some(cache_entry(61))));
        cache.expect_upsert().never();
        let service = CostReportService::new(Arc::new(cache), disconnected());
        let stale = service.cached_project_costs("e1", "88", false).await;
        assert!(matches!(stale, Err(FloconError::NotConnected)));

        let mut cache = MockCostCacheRepo::new();
        cache.expect_find().never();
        let service = CostReportService::new(Arc::new(cache), disconnected());
        let forced = service.cached_project_costs("e1", "88", true).await;
        assert!(matches!(forced, Err(FloconError::NotConnected)));
    }

    #[tokio::test]
    async fn unreadable_cache_is_bypassed() {
        let mut cache = MockCostCacheRepo::new();
        cache
            .expect_find()
            .returning(|_| Err(FloconError::Database("relation does not exist".into())));
        let service = CostReportService::new(Arc::new(cache), disconnected());
        let result = service.cached_project_costs("e1", "88", false).await;
        assert!(matches!(result, Err(FloconError::NotConnected)));
    }
}
