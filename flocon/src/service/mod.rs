pub mod cost_report;
pub mod engagement_sync;
pub mod invoice_sync;
pub mod migration;
pub mod party_pull;
pub mod token;
pub mod vendor_import;

#[cfg(test)]
pub(crate) mod mocks;
