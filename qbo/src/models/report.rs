//! Reports such as `ProfitAndLoss`, `GeneralLedger` and `TransactionList`.
//!
//! A report is a tree of rows. Section rows carry a `Header`, nested `Rows` and a
//! `Summary`; data rows carry `ColData`, one cell per report column.
use serde::{Deserialize, Serialize};

pub const PROFIT_AND_LOSS: &str = "ProfitAndLoss";
pub const GENERAL_LEDGER: &str = "GeneralLedger";
pub const TRANSACTION_LIST: &str = "TransactionList";

pub const DATA_ROW: &str = "Data";

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<ReportHeader>,
    #[serde(default)]
    pub rows: Rows,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ReportHeader {
    pub report_name: Option<String>,
    pub start_period: Option<String>,
    pub end_period: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Rows {
    #[serde(default)]
    pub row: Vec<Row>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Row {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub row_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Cells>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Rows>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<Cells>,
    #[serde(default)]
    pub col_data: Vec<ColData>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Cells {
    #[serde(default)]
    pub col_data: Vec<ColData>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ColData {
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Row {
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.row_type.as_deref() == Some(DATA_ROW)
    }

    /// Text of the cell in column `index`, empty when there is no such cell
    #[must_use]
    pub fn value(&self, index: usize) -> &str {
        self.col_data.get(index).map_or("", |c| c.value.as_str())
    }

    /// The nested rows of a section, if any
    #[must_use]
    pub fn children(&self) -> &[Row] {
        self.rows.as_ref().map_or(&[], |rows| rows.row.as_slice())
    }
}

impl Cells {
    #[must_use]
    pub fn value(&self, index: usize) -> &str {
        self.col_data.get(index).map_or("", |c| c.value.as_str())
    }
}

/// Parses a report amount such as `1,234.50` or `(12.00)`. Blank or garbled cells count as zero.
#[must_use]
pub fn amount(value: &str) -> f64 {
    value
        .replace([',', '(', ')'], "")
        .trim()
        .parse::<f64>()
        .unwrap_or_default()
}
