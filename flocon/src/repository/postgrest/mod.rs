//! Repositories backed by the hosted Postgres database, reached through its PostgREST
//! gateway at `{url}/rest/v1/`.
use crate::error::FloconError;
use log::debug;
use reqwest::{header::ACCEPT, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use url::Url;

pub(crate) mod postgrest_company_repo;
pub(crate) mod postgrest_cost_cache_repo;
pub(crate) mod postgrest_engagement_repo;
pub(crate) mod postgrest_migration_repo;
pub(crate) mod postgrest_pay_app_repo;
pub(crate) mod postgrest_token_repo;

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=minimal";

/// Query parameters of a PostgREST request, i.e. `("id", "eq.42")`
pub(crate) type Filters = Vec<(&'static str, String)>;

pub(crate) fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

pub(crate) fn ilike(value: &str) -> String {
    format!("ilike.{value}")
}

pub(crate) const IS_NULL: &str = "is.null";
pub(crate) const NOT_NULL: &str = "not.is.null";

/// Thin JSON client for the PostgREST gateway, authenticated with the service role key
#[derive(Clone, Debug)]
pub struct PostgrestClient {
    base: Url,
    key: String,
    client: Client,
}

impl PostgrestClient {
    #[allow(clippy::missing_errors_doc)]
    pub fn new(url: &str, service_role_key: &str) -> Result<Self, FloconError> {
        if url.trim().is_empty() {
            return Err(FloconError::MissingConfig("database url".to_string()));
        }
        if service_role_key.trim().is_empty() {
            return Err(FloconError::MissingConfig("database service_role_key".to_string()));
        }
        let base = Url::parse(&format!("{}/rest/v1/", url.trim_end_matches('/')))?;
        Ok(PostgrestClient {
            base,
            key: service_role_key.to_string(),
            client: Client::new(),
        })
    }

    fn request(&self, method: Method, path: &str, filters: &Filters) -> Result<RequestBuilder, FloconError> {
        let url = self.base.join(path)?;
        let request = self
            .client
            .request(method, url)
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header(ACCEPT, "application/json")
            .query(filters);
        Ok(request)
    }

    async fn send(request: RequestBuilder) -> Result<String, FloconError> {
        debug!("request '{:?}'", request);
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("status {:?} body '{:?}'", status, body);
        if status.is_success() {
            Ok(body)
        } else {
            Err(FloconError::Database(format!("{} - {body}", status.as_u16())))
        }
    }

    /// `GET /rest/v1/{table}` with the supplied filters
    pub(crate) async fn select<T>(&self, table: &str, mut filters: Filters) -> Result<Vec<T>, FloconError>
    where
        T: DeserializeOwned,
    {
        if !filters.iter().any(|(k, _)| *k == "select") {
            filters.push(("select", "*".to_string()));
        }
        let request = self.request(Method::GET, table, &filters)?;
        let body = Self::send(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// First row matching the filters, if any
    pub(crate) async fn select_first<T>(&self, table: &str, mut filters: Filters) -> Result<Option<T>, FloconError>
    where
        T: DeserializeOwned,
    {
        filters.push(("limit", "1".to_string()));
        Ok(self.select::<T>(table, filters).await?.into_iter().next())
    }

    pub(crate) async fn insert<B, T>(&self, table: &str, row: &B) -> Result<T, FloconError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let request = self
            .request(Method::POST, table, &Vec::new())?
            .header(PREFER, RETURN_REPRESENTATION)
            .json(&[row]);
        let body = Self::send(request).await?;
        let mut rows: Vec<T> = serde_json::from_str(&body)?;
        if rows.is_empty() {
            return Err(FloconError::Database(format!("insert into {table} returned no rows")));
        }
        Ok(rows.swap_remove(0))
    }

    /// `PATCH` the rows matching the filters. Returns the number of rows changed.
    pub(crate) async fn update<B>(&self, table: &str, filters: Filters, changes: &B) -> Result<usize, FloconError>
    where
        B: Serialize + Sync,
    {
        let request = self
            .request(Method::PATCH, table, &filters)?
            .header(PREFER, RETURN_REPRESENTATION)
            .json(changes);
        let body = Self::send(request).await?;
        let rows: Vec<Value> = serde_json::from_str(if body.is_empty() { "[]" } else { &body })?;
        Ok(rows.len())
    }

    pub(crate) async fn upsert<B>(&self, table: &str, on_conflict: &str, row: &B) -> Result<(), FloconError>
    where
        B: Serialize + Sync,
    {
        let filters = vec![("on_conflict", on_conflict.to_string())];
        let request = self
            .request(Method::POST, table, &filters)?
            .header(PREFER, MERGE_DUPLICATES)
            .json(&[row]);
        Self::send(request).await?;
        Ok(())
    }

    pub(crate) async fn insert_minimal<B>(&self, table: &str, row: &B) -> Result<(), FloconError>
    where
        B: Serialize + Sync,
    {
        let request = self
            .request(Method::POST, table, &Vec::new())?
            .header(PREFER, RETURN_MINIMAL)
            .json(&[row]);
        Self::send(request).await?;
        Ok(())
    }

    /// Calls a database function, `POST /rest/v1/rpc/{function}`
    pub(crate) async fn rpc(&self, function: &str, args: &Value) -> Result<Value, FloconError> {
        let request = self
            .request(Method::POST, &format!("rpc/{function}"), &Vec::new())?
            .json(args);
        let body = Self::send(request).await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
