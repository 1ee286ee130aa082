use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::core::{QboEntity, Reference};

pub const SALES_ITEM_LINE_DETAIL: &str = "SalesItemLineDetail";

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub txn_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_ref: Option<Reference>,
    #[serde(default)]
    pub line: Vec<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    /// Only the fields present in the request are updated
    #[serde(rename = "sparse", skip_serializing_if = "Option::is_none")]
    pub sparse: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Line {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: f64,
    pub detail_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_item_line_detail: Option<SalesItemLineDetail>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SalesItemLineDetail {
    pub item_ref: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
}

impl QboEntity for Invoice {
    const ENTITY: &'static str = "Invoice";
}

impl Line {
    /// A single quantity service line where the unit price equals the amount
    #[must_use]
    pub fn service(description: String, amount: f64, item_id: &str) -> Self {
        Line {
            description: Some(description),
            amount,
            detail_type: SALES_ITEM_LINE_DETAIL.to_string(),
            sales_item_line_detail: Some(SalesItemLineDetail {
                item_ref: Reference::to(item_id),
                qty: Some(1.0),
                unit_price: Some(amount),
            }),
        }
    }
}

impl Invoice {
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or_default()
    }

    /// The amount paid so far, i.e. the total less the outstanding balance
    #[must_use]
    pub fn amount_paid(&self) -> f64 {
        self.total_amt.unwrap_or_default() - self.balance.unwrap_or_default()
    }
}
