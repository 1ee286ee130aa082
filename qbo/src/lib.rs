//!
//! `qbo` is a small client for the QuickBooks Online v3 accounting REST API, covering the
//! entities FloCon pushes to and pulls from QuickBooks: customers, jobs, items, accounts,
//! invoices and vendors, plus the cost transactions and reports used for job costing.
//! The Intuit OAuth2 flow lives in [`oauth`].
//!
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::{
    header::{ACCEPT, CONTENT_TYPE},
    Client, Method, RequestBuilder, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use models::{
    core::{escape_literal, QboEntity},
    customer::Customer,
    invoice::Invoice,
    item::{Account, Item},
    report::{Report, GENERAL_LEDGER, PROFIT_AND_LOSS, TRANSACTION_LIST},
    transaction::{ExpenseKind, ExpenseTransaction, Paycheck},
    vendor::{NewVendor, Vendor},
};

pub mod builder;
pub mod config;
pub mod models;
pub mod oauth;

pub use builder::{QuickBooksBuilder, QuickBooksBuilderError};

pub type Result<T> = std::result::Result<T, QboError>;

/// Upper bound QuickBooks accepts for a single query page
pub const MAX_RESULTS: u32 = 1000;

pub const SERVICE_ITEM_TYPE: &str = "Service";

#[derive(Debug, Error)]
pub enum QboError {
    #[error("QBO API error: {} - {body}", code.as_u16())]
    Fault { code: StatusCode, body: String },
    #[error("Request to QuickBooks failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Could not serialize/deserialize: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid QuickBooks URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0} missing from QuickBooks response")]
    MissingEntity(&'static str),
}

#[derive(Clone, Debug)]
pub enum Credentials {
    Basic(String, String),
    Bearer(String),
}

impl Credentials {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Basic(ref user, ref pass) => {
                request.basic_auth(user.to_owned(), Some(pass.to_owned()))
            }
            Credentials::Bearer(ref token) => request.bearer_auth(token.to_owned()),
        }
    }
}

/// Client bound to a single company (realm) and access token
#[derive(Clone, Debug)]
pub struct QuickBooks {
    base: Url,
    realm_id: String,
    credentials: Credentials,
    pub client: Client,
}

impl QuickBooks {
    #[must_use]
    pub fn builder() -> QuickBooksBuilder {
        QuickBooksBuilder::new()
    }

    #[must_use]
    pub fn realm_id(&self) -> &str {
        &self.realm_id
    }

    async fn request(&self, method: Method, endpoint: &str, body: Option<Vec<u8>>) -> Result<Value> {
        let url = self
            .base
            .join(&format!("v3/company/{}/{endpoint}", self.realm_id))?;

        let mut request = self
            .client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");

        request = self.credentials.apply(request);

        if let Some(body) = body {
            request = request.body(body);
        }
        debug!("request '{:?}'", request);

        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("status {:?} body '{:?}'", status, body);
        if !status.is_success() {
            return Err(QboError::Fault { code: status, body });
        }
        let data = if body.is_empty() { "null" } else { &body };
        Ok(serde_json::from_str::<Value>(data)?)
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn get<T>(&self, endpoint: &str) -> Result<T>
    where
        T: QboEntity + DeserializeOwned,
    {
        let value = self.request(Method::GET, endpoint, None).await?;
        Self::unwrap_entity(value)
    }

    async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize,
        T: QboEntity + DeserializeOwned,
    {
        let data = serde_json::to_vec(body)?;
        let value = self.request(Method::POST, endpoint, Some(data)).await?;
        Self::unwrap_entity(value)
    }

    /// Runs a query written in the QuickBooks query language. Returns the raw response.
    #[allow(clippy::missing_errors_doc)]
    pub async fn raw_query(&self, query: &str) -> Result<Value> {
        debug!("QBO query: {query}");
        let resource = format!("query?query={}", urlencoding::encode(query));
        self.request(Method::GET, &resource, None).await
    }

    /// Runs a query and extracts the list of `T` entities from the `QueryResponse`
    /// envelope. An absent list means nothing matched.
    #[allow(clippy::missing_errors_doc)]
    pub async fn query<T>(&self, query: &str) -> Result<Vec<T>>
    where
        T: QboEntity + DeserializeOwned,
    {
        self.query_entities(query, T::ENTITY).await
    }

    async fn query_entities<T>(&self, query: &str, entity: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut value = self.raw_query(query).await?;
        match value
            .get_mut("QueryResponse")
            .and_then(|qr| qr.get_mut(entity))
        {
            Some(list) => Ok(serde_json::from_value(list.take())?),
            None => Ok(Vec::new()),
        }
    }

    /// Fetches a report, i.e. `ProfitAndLoss`, with the given query parameters
    #[allow(clippy::missing_errors_doc)]
    pub async fn report(&self, name: &str, params: &[(&str, &str)]) -> Result<Report> {
        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        let value = self
            .request(Method::GET, &format!("reports/{name}?{query}"), None)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn query_first<T>(&self, query: &str) -> Result<Option<T>>
    where
        T: QboEntity + DeserializeOwned,
    {
        Ok(self.query::<T>(query).await?.into_iter().next())
    }

    fn unwrap_entity<T>(mut value: Value) -> Result<T>
    where
        T: QboEntity + DeserializeOwned,
    {
        match value.get_mut(T::ENTITY) {
            Some(entity) => Ok(serde_json::from_value(entity.take())?),
            None => Err(QboError::MissingEntity(T::ENTITY)),
        }
    }

    // -----------------------
    // Customers and jobs

    #[allow(clippy::missing_errors_doc)]
    pub async fn get_customer(&self, id: &str) -> Result<Customer> {
        self.get::<Customer>(&format!("customer/{id}")).await
    }

    /// Looks up a customer by exact display name, inactive ones included
    #[allow(clippy::missing_errors_doc)]
    pub async fn find_customer_by_name(&self, name: &str) -> Result<Option<Customer>> {
        let query = format!(
            "SELECT * FROM Customer WHERE DisplayName = '{}' AND Active IN (true, false)",
            escape_literal(name)
        );
        self.query_first::<Customer>(&query).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn create_customer(&self, customer: &Customer) -> Result<Customer> {
        self.post("customer", customer).await
    }

    /// Full update of the customer with a new display and company name
    #[allow(clippy::missing_errors_doc)]
    pub async fn update_customer_name(&self, id: &str, name: &str) -> Result<Customer> {
        let mut customer = self.get_customer(id).await?;
        customer.display_name = Some(name.to_string());
        customer.company_name = Some(name.to_string());
        self.post("customer", &customer).await
    }

    /// Jobs whose display name starts with the project number, inactive ones included
    #[allow(clippy::missing_errors_doc)]
    pub async fn find_jobs_by_project_number(&self, project_number: &str) -> Result<Vec<Customer>> {
        let query = format!(
            "SELECT * FROM Customer WHERE Job = true AND DisplayName LIKE '{}%' AND Active IN (true, false)",
            escape_literal(project_number)
        );
        self.query::<Customer>(&query).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn create_job(
        &self,
        customer_id: &str,
        project_number: &str,
        project_name: &str,
    ) -> Result<Customer> {
        let job = Customer::job_of(customer_id, project_number, project_name);
        self.post("customer", &job).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        self.query::<Customer>(&format!("SELECT * FROM Customer MAXRESULTS {MAX_RESULTS}"))
            .await
    }

    // -----------------------
    // Items and accounts

    #[allow(clippy::missing_errors_doc)]
    pub async fn find_item(&self, name: &str, item_type: &str) -> Result<Option<Item>> {
        let query = format!(
            "SELECT * FROM Item WHERE Name = '{}' AND Type = '{}'",
            escape_literal(name),
            escape_literal(item_type)
        );
        self.query_first::<Item>(&query).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn create_service_item(&self, name: &str, income_account_id: &str) -> Result<Item> {
        let item = Item {
            id: None,
            name: name.to_string(),
            item_type: SERVICE_ITEM_TYPE.to_string(),
            income_account_ref: Some(models::core::Reference::to(income_account_id)),
        };
        self.post::<Item, Item>("item", &item).await
    }

    /// The first service fee income account, otherwise any income account
    #[allow(clippy::missing_errors_doc)]
    pub async fn find_income_account(&self) -> Result<Option<Account>> {
        let service_fee = self
            .query_first::<Account>(
                "SELECT * FROM Account WHERE AccountType = 'Income' AND AccountSubType = 'ServiceFeeIncome' MAXRESULTS 1",
            )
            .await?;
        if service_fee.is_some() {
            return Ok(service_fee);
        }
        self.query_first::<Account>("SELECT * FROM Account WHERE AccountType = 'Income' MAXRESULTS 1")
            .await
    }

    // -----------------------
    // Invoices

    #[allow(clippy::missing_errors_doc)]
    pub async fn find_invoice_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        let query = format!("SELECT * FROM Invoice WHERE Id = '{}'", escape_literal(id));
        self.query_first::<Invoice>(&query).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn find_invoice_by_doc_number(&self, doc_number: &str) -> Result<Option<Invoice>> {
        let query = format!(
            "SELECT * FROM Invoice WHERE DocNumber = '{}'",
            escape_literal(doc_number)
        );
        self.query_first::<Invoice>(&query).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn find_invoices_for_customer(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        let query = format!(
            "SELECT * FROM Invoice WHERE CustomerRef = '{}' MAXRESULTS {MAX_RESULTS}",
            escape_literal(customer_id)
        );
        self.query::<Invoice>(&query).await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn create_invoice(&self, invoice: &Invoice) -> Result<Invoice> {
        self.post("invoice", invoice).await
    }

    /// Sparse update of an existing invoice. `id` and `sync_token` must be set.
    #[allow(clippy::missing_errors_doc)]
    pub async fn update_invoice(&self, invoice: &Invoice) -> Result<Invoice> {
        let sparse = Invoice {
            sparse: Some(true),
            ..invoice.clone()
        };
        self.post("invoice", &sparse).await
    }

    // -----------------------
    // Vendors

    #[allow(clippy::missing_errors_doc)]
    pub async fn list_vendors(&self) -> Result<Vec<Vendor>> {
        self.query::<Vendor>(&format!("SELECT * FROM Vendor MAXRESULTS {MAX_RESULTS}"))
            .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn create_vendor(&self, vendor: &NewVendor) -> Result<Vendor> {
        self.post("vendor", vendor).await
    }

    // -----------------------
    // Job costs

    /// Bills, purchases or vendor credits dated within `start..=end`
    #[allow(clippy::missing_errors_doc)]
    pub async fn expenses_between(
        &self,
        kind: ExpenseKind,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ExpenseTransaction>> {
        self.query_entities(&dated_query(kind.entity(), start, end), kind.entity())
            .await
    }

    /// Entities of type `T`, i.e. `JournalEntry` or `TimeActivity`, dated within `start..=end`
    #[allow(clippy::missing_errors_doc)]
    pub async fn transactions_between<T>(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<T>>
    where
        T: QboEntity + DeserializeOwned,
    {
        self.query::<T>(&dated_query(T::ENTITY, start, end)).await
    }

    /// Paychecks dated within `start..=end`. Uses the query endpoint first and the
    /// dedicated paycheck endpoint when the query is refused.
    #[allow(clippy::missing_errors_doc)]
    pub async fn paychecks_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Paycheck>> {
        match self.transactions_between::<Paycheck>(start, end).await {
            Ok(paychecks) => Ok(paychecks),
            Err(e) => {
                info!("Paycheck query failed, trying the paycheck endpoint: {e}");
                let mut value = self
                    .request(
                        Method::GET,
                        &format!("paycheck?startdate={start}&enddate={end}"),
                        None,
                    )
                    .await?;
                let key = if value.get(Paycheck::ENTITY).is_some() {
                    Paycheck::ENTITY
                } else {
                    "paychecks"
                };
                match value.get_mut(key).map(Value::take) {
                    Some(list) => Ok(serde_json::from_value(list)?),
                    None => Ok(Vec::new()),
                }
            }
        }
    }

    /// Cash basis profit and loss restricted to one customer or job
    #[allow(clippy::missing_errors_doc)]
    pub async fn cash_profit_and_loss(
        &self,
        customer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Report> {
        let (start, end) = (start.to_string(), end.to_string());
        self.report(
            PROFIT_AND_LOSS,
            &[
                ("start_date", &start),
                ("end_date", &end),
                ("accounting_method", "Cash"),
                ("customer", customer_id),
                ("summarize_column_by", "Total"),
            ],
        )
        .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn transaction_list(
        &self,
        customer_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Report> {
        let (start, end) = (start.to_string(), end.to_string());
        self.report(
            TRANSACTION_LIST,
            &[("start_date", &start), ("end_date", &end), ("customer", customer_id)],
        )
        .await
    }

    #[allow(clippy::missing_errors_doc)]
    pub async fn general_ledger(&self, start: NaiveDate, end: NaiveDate) -> Result<Report> {
        let (start, end) = (start.to_string(), end.to_string());
        self.report(GENERAL_LEDGER, &[("start_date", &start), ("end_date", &end)])
            .await
    }
}

fn dated_query(entity: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "SELECT * FROM {entity} WHERE TxnDate >= '{start}' AND TxnDate <= '{end}' MAXRESULTS {MAX_RESULTS}"
    )
}
