//! Pay apps go to QuickBooks as invoices billed to the project's job, payments come back.
use crate::error::FloconError;
use crate::repository::engagement_repository::EngagementRepository;
use crate::repository::pay_app_repository::PayAppRepository;
use crate::service::token::TokenService;
use crate::types::{
    BatchResult, Engagement, InvoiceMatch, InvoiceSyncResult, LinkError, LinkInvoicesResult,
    MatchType, PayApp, PayAppSyncResult, PayAppUpdate, PaymentResult, PaymentStatus,
    UnmatchedPayApp,
};
use chrono::Utc;
use log::{debug, error, info, warn};
use qbo::models::core::Reference;
use qbo::models::invoice::{Invoice, Line};
use qbo::{QuickBooks, SERVICE_ITEM_TYPE};
use std::sync::Arc;

pub const SERVICE_ITEM_NAME: &str = "Construction Services";

/// Income account used for the service item when the company has no income account
pub const DEFAULT_INCOME_ACCOUNT_ID: &str = "79";

const NOT_AVAILABLE: &str = "N/A";
const AMOUNT_TOLERANCE: f64 = 0.01;

pub struct InvoiceSyncService {
    engagements: Arc<dyn EngagementRepository>,
    pay_apps: Arc<dyn PayAppRepository>,
    tokens: Arc<TokenService>,
}

impl InvoiceSyncService {
    pub fn new(
        engagements: Arc<dyn EngagementRepository>,
        pay_apps: Arc<dyn PayAppRepository>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            engagements,
            pay_apps,
            tokens,
        }
    }

    /// Creates or updates the invoice of a pay app and records the outcome on the pay app.
    /// A failure never touches the invoice id already stored.
    pub async fn sync_pay_app(&self, pay_app_id: &str) -> InvoiceSyncResult {
        info!("Starting sync for pay app: {pay_app_id}");
        let (pay_app, engagement, job_id) = match self.load_billable(pay_app_id).await {
            Ok(loaded) => loaded,
            Err(e) => return InvoiceSyncResult::failed(e.to_string()),
        };

        let invoice_id = match self.push_invoice(&pay_app, &engagement, &job_id).await {
            Ok(id) => id,
            Err(e) => {
                let message = e.to_string();
                error!("Error syncing pay app {pay_app_id}: {message}");
                if let Err(e) = self
                    .pay_apps
                    .update(pay_app_id, &PayAppUpdate::failed(&message))
                    .await
                {
                    warn!("Unable to record the sync error of pay app {pay_app_id}: {e}");
                }
                return InvoiceSyncResult::failed(message);
            }
        };

        if let Err(e) = self
            .pay_apps
            .update(pay_app_id, &PayAppUpdate::synced(&invoice_id, Utc::now()))
            .await
        {
            error!("Error updating pay app {pay_app_id}: {e}");
            return InvoiceSyncResult {
                success: false,
                invoice_id: Some(invoice_id),
                error: Some("Invoice created but failed to update FloCon record".to_string()),
            };
        }
        InvoiceSyncResult {
            success: true,
            invoice_id: Some(invoice_id),
            error: None,
        }
    }

    /// The pay app, its engagement and the QuickBooks job to bill
    async fn load_billable(&self, pay_app_id: &str) -> Result<(PayApp, Engagement, String), FloconError> {
        let pay_app = self
            .pay_apps
            .find_by_id(pay_app_id)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| FloconError::NotFound("Pay app not found".to_string()))?;
        let engagement = self
            .engagements
            .find_by_id(&pay_app.engagement_id)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| FloconError::NotFound("Engagement not found".to_string()))?;
        let job_id = engagement
            .qbo_job_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FloconError::Sync("Project must be synced to QuickBooks first".to_string()))?;
        Ok((pay_app, engagement, job_id))
    }

    async fn push_invoice(
        &self,
        pay_app: &PayApp,
        engagement: &Engagement,
        job_id: &str,
    ) -> Result<String, FloconError> {
        let client = self.tokens.authenticated_client().await?;
        let item_id = service_item_id(&client).await?;
        let invoice = build_invoice(pay_app, engagement, job_id, &item_id);

        let synced = match pay_app.qbo_invoice_id.as_deref().filter(|id| !id.is_empty()) {
            Some(existing_id) => {
                info!("Updating existing invoice: {existing_id}");
                match update_invoice(&client, existing_id, &invoice).await {
                    Ok(updated) => updated,
                    Err(e) => {
                        warn!("Update failed, invoice may have been deleted. Creating new invoice: {e}");
                        client.create_invoice(&invoice).await?
                    }
                }
            }
            None => match invoice.doc_number.as_deref() {
                Some(doc_number) => match client.find_invoice_by_doc_number(doc_number).await {
                    Ok(Some(existing)) => {
                        info!("Found existing invoice {} with DocNumber {doc_number}", existing.id());
                        existing
                    }
                    Ok(None) => client.create_invoice(&invoice).await?,
                    Err(e) => {
                        warn!("Error checking for existing invoice, creating one: {e}");
                        client.create_invoice(&invoice).await?
                    }
                },
                None => client.create_invoice(&invoice).await?,
            },
        };
        synced
            .id
            .ok_or_else(|| FloconError::Qbo("QuickBooks returned an invoice without an id".to_string()))
    }

    /// Reads the amount paid on the pay app's invoice and derives the pay app status from it
    pub async fn pull_payment(&self, pay_app_id: &str) -> PaymentResult {
        match self.try_pull_payment(pay_app_id).await {
            Ok(payment_total) => PaymentResult {
                success: true,
                payment_total: Some(payment_total),
                error: None,
            },
            Err(e) => {
                error!("Error pulling payment info of {pay_app_id}: {e}");
                PaymentResult::failed(e.to_string())
            }
        }
    }

    async fn try_pull_payment(&self, pay_app_id: &str) -> Result<f64, FloconError> {
        let invoice_id = self
            .pay_apps
            .find_by_id(pay_app_id)
            .await
            .ok()
            .flatten()
            .and_then(|p| p.qbo_invoice_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FloconError::Sync("Invoice not synced to QuickBooks".to_string()))?;

        let client = self.tokens.authenticated_client().await?;
        let invoice = client
            .find_invoice_by_id(&invoice_id)
            .await?
            .ok_or_else(|| FloconError::NotFound("Invoice not found in QuickBooks".to_string()))?;

        let payment_total = invoice.amount_paid();
        let status = PaymentStatus::from_balance(invoice.balance.unwrap_or_default(), payment_total);
        let update = PayAppUpdate {
            qbo_payment_total: Some(payment_total),
            status: Some(status.as_str().to_string()),
            ..Default::default()
        };
        self.pay_apps.update(pay_app_id, &update).await.map_err(|e| {
            error!("Error updating payment info: {e}");
            FloconError::Database("Failed to update payment information".to_string())
        })?;
        Ok(payment_total)
    }

    /// Syncs every pay app of the engagement, pulling the payment after each success.
    ///
    /// # Errors
    /// Returns an error if the pay apps can not be listed
    pub async fn sync_billing(&self, engagement_id: &str) -> Result<BatchResult<PayAppSyncResult>, FloconError> {
        let pay_apps = self.pay_apps.find_by_engagement(engagement_id).await?;
        info!("Found {} pay apps to sync for project {engagement_id}", pay_apps.len());

        let mut batch = BatchResult::default();
        for pay_app in pay_apps {
            let result = self.sync_pay_app(&pay_app.id).await;
            let success = result.success;
            if success {
                let payment = self.pull_payment(&pay_app.id).await;
                if !payment.success {
                    debug!("Ignoring failed payment pull of {}: {:?}", pay_app.id, payment.error);
                }
            }
            batch.record(
                PayAppSyncResult {
                    pay_app_id: pay_app.id,
                    result,
                },
                success,
            );
        }
        Ok(batch)
    }

    /// Links pay apps without an invoice to the invoices already billed to the job,
    /// matching on document number first, then on amount and date.
    ///
    /// # Errors
    /// `NotFound` for an unknown engagement, `Sync` when the project has no job,
    /// or the error of listing pay apps or invoices
    pub async fn link_existing_invoices(&self, engagement_id: &str) -> Result<LinkInvoicesResult, FloconError> {
        let engagement = self
            .engagements
            .find_by_id(engagement_id)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| FloconError::NotFound("Engagement not found".to_string()))?;
        let job_id = engagement
            .qbo_job_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| FloconError::Sync("Project must be synced to QuickBooks first".to_string()))?;

        let pay_apps = self
            .pay_apps
            .find_unlinked_by_engagement(engagement_id)
            .await
            .map_err(|e| FloconError::Database(format!("Error fetching pay apps: {e}")))?;
        if pay_apps.is_empty() {
            return Ok(LinkInvoicesResult {
                success: true,
                message: Some("No unlinked pay apps found".to_string()),
                ..Default::default()
            });
        }

        let client = self.tokens.authenticated_client().await?;
        let invoices = client.find_invoices_for_customer(&job_id).await?;
        if invoices.is_empty() {
            return Ok(LinkInvoicesResult {
                success: true,
                message: Some("No invoices found in QuickBooks for this project".to_string()),
                ..Default::default()
            });
        }

        let (matches, unmatched) = match_invoices(&pay_apps, &invoices);

        let mut result = LinkInvoicesResult {
            success: true,
            total: pay_apps.len(),
            ..Default::default()
        };
        for found in &matches {
            let update = PayAppUpdate {
                qbo_sync_error: None,
                ..PayAppUpdate::synced(&found.invoice_id, Utc::now())
            };
            match self.pay_apps.update(&found.pay_app_id, &update).await {
                Ok(()) => result.matched += 1,
                Err(e) => result.errors.push(LinkError {
                    pay_app_id: found.pay_app_id.clone(),
                    error: e.to_string(),
                }),
            }
        }
        result.matches = matches;
        result.unmatched = unmatched;
        Ok(result)
    }
}

/// Id of the service item every invoice line refers to, created when missing
async fn service_item_id(client: &QuickBooks) -> Result<String, FloconError> {
    if let Some(id) = client
        .find_item(SERVICE_ITEM_NAME, SERVICE_ITEM_TYPE)
        .await?
        .and_then(|item| item.id)
    {
        return Ok(id);
    }
    let account_id = client
        .find_income_account()
        .await?
        .map_or_else(|| DEFAULT_INCOME_ACCOUNT_ID.to_string(), |account| account.id);
    info!("Creating service item with account: {account_id}");
    client
        .create_service_item(SERVICE_ITEM_NAME, &account_id)
        .await?
        .id
        .ok_or_else(|| FloconError::Qbo("QuickBooks returned an item without an id".to_string()))
}

/// Sparse update of the existing invoice, with the `SyncToken` it currently has
async fn update_invoice(client: &QuickBooks, invoice_id: &str, invoice: &Invoice) -> Result<Invoice, FloconError> {
    let existing = client
        .find_invoice_by_id(invoice_id)
        .await?
        .ok_or_else(|| FloconError::NotFound("Existing invoice not found in QuickBooks".to_string()))?;
    let update = Invoice {
        id: Some(invoice_id.to_string()),
        sync_token: existing.sync_token,
        ..invoice.clone()
    };
    Ok(client.update_invoice(&update).await?)
}

/// `{project_number}-{pay_app_number}`, or just the pay app number
fn doc_number(pay_app: &PayApp, engagement: &Engagement) -> Option<String> {
    let pay_app_number = pay_app.pay_app_number()?;
    Some(match engagement.project_number() {
        Some(project_number) => format!("{project_number}-{pay_app_number}"),
        None => pay_app_number.to_string(),
    })
}

fn build_invoice(pay_app: &PayApp, engagement: &Engagement, job_id: &str, item_id: &str) -> Invoice {
    let amount = pay_app.current_payment_due.unwrap_or_default();
    let description = pay_app
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| {
            format!(
                "Payment Application #{}",
                pay_app.pay_app_number().unwrap_or(&pay_app.id)
            )
        });
    Invoice {
        doc_number: doc_number(pay_app, engagement),
        txn_date: Some(pay_app.period_end.unwrap_or_else(|| Utc::now().date_naive())),
        customer_ref: Some(Reference::to(job_id)),
        line: vec![Line::service(description, amount, item_id)],
        ..Default::default()
    }
}

fn match_invoices(pay_apps: &[PayApp], invoices: &[Invoice]) -> (Vec<InvoiceMatch>, Vec<UnmatchedPayApp>) {
    let mut matches = Vec::new();
    let mut unmatched = Vec::new();

    for pay_app in pay_apps {
        let by_doc_number = pay_app.pay_app_number().and_then(|number| {
            invoices
                .iter()
                .find(|inv| inv.doc_number.as_deref() == Some(number))
                .map(|inv| (inv, MatchType::DocNumber))
        });
        let found = by_doc_number.or_else(|| {
            let submitted = pay_app.date_submitted?;
            let amount = pay_app.billed_amount();
            invoices
                .iter()
                .find(|inv| {
                    inv.txn_date == Some(submitted)
                        && inv.total_amt.is_some_and(|total| (total - amount).abs() < AMOUNT_TOLERANCE)
                })
                .map(|inv| (inv, MatchType::AmountAndDate))
        });

        let pay_app_number = pay_app.pay_app_number().unwrap_or(NOT_AVAILABLE).to_string();
        match found {
            Some((invoice, match_type)) => matches.push(InvoiceMatch {
                pay_app_id: pay_app.id.clone(),
                pay_app_number,
                invoice_id: invoice.id().to_string(),
                invoice_doc_number: invoice.doc_number.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                match_type,
            }),
            None => unmatched.push(UnmatchedPayApp {
                pay_app_id: pay_app.id.clone(),
                pay_app_number,
                amount: pay_app.billed_amount(),
            }),
        }
    }
    (matches, unmatched)
}
