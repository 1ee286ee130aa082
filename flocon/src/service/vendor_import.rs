//! Creates QuickBooks vendors from a vendor list exported as CSV.
//!
//! The list has a header row. The vendor name is in the first column and the third
//! column holds `TRUE` for project vendors, which are created with 1099 tracking on.
use crate::error::FloconError;
use crate::service::token::TokenService;
use crate::types::{ImportOutcome, ImportedVendor, VendorImportResult};
use csv::ReaderBuilder;
use log::{debug, info, warn};
use qbo::models::vendor::NewVendor;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Pause between two vendors, keeps us below the QBO rate limits
pub const IMPORT_DELAY: Duration = Duration::from_millis(100);

const NAME_COLUMN: usize = 0;
const PROJECT_VENDOR_COLUMN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorRow {
    pub name: String,
    pub is_project_vendor: bool,
}

/// Reads the vendor rows, skipping the header, short rows and rows without a name
///
/// # Errors
/// Returns an error if the input is not readable as CSV
pub fn read_vendors<R: io::Read>(rdr: R) -> Result<Vec<VendorRow>, FloconError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(rdr);

    let mut vendors = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() <= PROJECT_VENDOR_COLUMN {
            continue;
        }
        let name = record.get(NAME_COLUMN).unwrap_or_default().trim();
        if name.is_empty() {
            continue;
        }
        let is_project_vendor = record
            .get(PROJECT_VENDOR_COLUMN)
            .is_some_and(|flag| flag.trim().eq_ignore_ascii_case("true"));
        vendors.push(VendorRow {
            name: name.to_string(),
            is_project_vendor,
        });
    }
    Ok(vendors)
}

pub struct VendorImportService {
    tokens: Arc<TokenService>,
    delay: Duration,
}

impl VendorImportService {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self {
            tokens,
            delay: IMPORT_DELAY,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Creates each vendor in QuickBooks. Names QuickBooks already knows are counted as
    /// skipped, any other failure as an error; neither stops the import.
    ///
    /// # Errors
    /// `NotConnected` without tokens
    pub async fn import(&self, vendors: &[VendorRow]) -> Result<VendorImportResult, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        let mut result = VendorImportResult {
            total: vendors.len(),
            project_vendors: vendors.iter().filter(|v| v.is_project_vendor).count(),
            ..Default::default()
        };

        for (i, vendor) in vendors.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            debug!("Creating vendor {} (project vendor: {})", vendor.name, vendor.is_project_vendor);
            let outcome = match client
                .create_vendor(&NewVendor::named(&vendor.name, vendor.is_project_vendor))
                .await
            {
                Ok(created) => {
                    result.created += 1;
                    ImportedVendor {
                        name: vendor.name.clone(),
                        outcome: ImportOutcome::Created,
                        qbo_id: Some(created.id),
                        error: None,
                    }
                }
                Err(e) => {
                    let error = e.to_string();
                    let outcome = if error.to_lowercase().contains("duplicate") {
                        result.skipped += 1;
                        ImportOutcome::Duplicate
                    } else {
                        warn!("Failed to create vendor {}: {error}", vendor.name);
                        result.errors += 1;
                        ImportOutcome::Failed
                    };
                    ImportedVendor {
                        name: vendor.name.clone(),
                        outcome,
                        qbo_id: None,
                        error: Some(error),
                    }
                }
            };
            result.results.push(outcome);
        }

        info!(
            "Vendor import done: {} created, {} skipped, {} errors",
            result.created, result.skipped, result.errors
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::mocks::disconnected;

    #[test]
    fn rows_are_read_after_the_header() {
        let csv = "Vendor,Contact,Project Vendor\n\
                   Baker Electric,Ann,TRUE\n\
                   \"Smith, Jones & Co\",,false\n\
                   Lonely\n\
                   ,Nobody,TRUE\n\
                   Harbor Lumber,Bo,true\n";
        let vendors = read_vendors(csv.as_bytes()).unwrap();
        assert_eq!(
            vendors,
            vec![
                VendorRow {
                    name: "Baker Electric".into(),
                    is_project_vendor: true
                },
                VendorRow {
                    name: "Smith, Jones & Co".into(),
                    is_project_vendor: false
                },
                VendorRow {
                    name: "Harbor Lumber".into(),
                    is_project_vendor: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn import_needs_a_connection() {
        let service = VendorImportService::new(disconnected()).with_delay(Duration::ZERO);
        let result = service
            .import(&[VendorRow {
                name: "Baker Electric".into(),
                is_project_vendor: false,
            }])
            .await;
        assert!(matches!(result, Err(FloconError::NotConnected)));
    }
}
