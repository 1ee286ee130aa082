//! Cost transactions: bills, purchases, vendor credits, journal entries, time
//! activities and paychecks. Only the fields needed to attribute costs to a job are
//! modelled.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::core::{lenient_amount, QboEntity, Reference};

pub const DEBIT: &str = "Debit";

/// The transaction types sharing the expense line layout
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpenseKind {
    Bill,
    Purchase,
    VendorCredit,
}

impl ExpenseKind {
    #[must_use]
    pub fn entity(self) -> &'static str {
        match self {
            ExpenseKind::Bill => "Bill",
            ExpenseKind::Purchase => "Purchase",
            ExpenseKind::VendorCredit => "VendorCredit",
        }
    }
}

/// A `Bill`, `Purchase` or `VendorCredit`
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseTransaction {
    pub id: Option<String>,
    pub txn_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amt: Option<f64>,
    #[serde(default)]
    pub line: Vec<ExpenseLine>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseLine {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub customer_ref: Option<Reference>,
    pub account_based_expense_line_detail: Option<ExpenseLineDetail>,
    pub item_based_expense_line_detail: Option<ExpenseLineDetail>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseLineDetail {
    pub customer_ref: Option<Reference>,
}

impl ExpenseLine {
    /// The customer or job the line is billed to, wherever QuickBooks put it
    #[must_use]
    pub fn customer_id(&self) -> Option<&str> {
        self.customer_ref
            .as_ref()
            .or_else(|| {
                self.account_based_expense_line_detail
                    .as_ref()
                    .and_then(|d| d.customer_ref.as_ref())
            })
            .or_else(|| {
                self.item_based_expense_line_detail
                    .as_ref()
                    .and_then(|d| d.customer_ref.as_ref())
            })
            .map(|r| r.value.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct JournalEntry {
    pub id: Option<String>,
    pub txn_date: Option<NaiveDate>,
    #[serde(default)]
    pub line: Vec<JournalLine>,
}

impl QboEntity for JournalEntry {
    const ENTITY: &'static str = "JournalEntry";
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct JournalLine {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub journal_entry_line_detail: Option<JournalLineDetail>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct JournalLineDetail {
    pub posting_type: Option<String>,
    pub entity: Option<JournalLineEntity>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct JournalLineEntity {
    pub entity_ref: Option<Reference>,
}

impl JournalLine {
    /// Debit lines posted against `job_id`
    #[must_use]
    pub fn is_debit_to(&self, job_id: &str) -> bool {
        self.journal_entry_line_detail.as_ref().is_some_and(|detail| {
            detail.posting_type.as_deref() == Some(DEBIT)
                && detail
                    .entity
                    .as_ref()
                    .and_then(|e| e.entity_ref.as_ref())
                    .is_some_and(|r| r.value == job_id)
        })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TimeActivity {
    pub id: Option<String>,
    pub txn_date: Option<NaiveDate>,
    pub customer_ref: Option<Reference>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub cost_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub hourly_rate: Option<f64>,
}

impl QboEntity for TimeActivity {
    const ENTITY: &'static str = "TimeActivity";
}

impl TimeActivity {
    /// Hours worked times the cost rate, or the billing rate when no cost rate is set
    #[must_use]
    pub fn cost(&self) -> f64 {
        let hours = self.hours.unwrap_or_default() + self.minutes.unwrap_or_default() / 60.0;
        let rate = self
            .cost_rate
            .filter(|r| *r != 0.0)
            .or(self.hourly_rate)
            .unwrap_or_default();
        hours * rate
    }
}

/// Paychecks come from the payroll API, which is only open to apps granted the
/// payroll scope. Field casing differs between the query and the report style endpoint.
#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct Paycheck {
    #[serde(rename = "Id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(rename = "Earnings", alias = "earnings", default)]
    pub earnings: Vec<Earning>,
}

impl QboEntity for Paycheck {
    const ENTITY: &'static str = "Paycheck";
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct Earning {
    #[serde(
        rename = "Amount",
        alias = "amount",
        default,
        deserialize_with = "lenient_amount"
    )]
    pub amount: Option<f64>,
    #[serde(rename = "CustomerRef", alias = "customer_ref", default)]
    pub customer_ref: Option<Reference>,
    #[serde(rename = "JobRef", default)]
    pub job_ref: Option<Reference>,
}

impl Earning {
    #[must_use]
    pub fn is_for(&self, job_id: &str) -> bool {
        self.customer_ref
            .as_ref()
            .or(self.job_ref.as_ref())
            .is_some_and(|r| r.value == job_id)
    }
}
