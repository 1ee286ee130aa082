//! The `/api/qbo` routes
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use flocon::error::FloconError;
use flocon::service::cost_report::DateRange;
use flocon::ApplicationRuntime;
use log::{error, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

type AppState = Arc<ApplicationRuntime>;

const SETTINGS_PAGE: &str = "/settings";

pub fn router(runtime: AppState) -> Router {
    Router::new()
        .route("/api/qbo/sync-project", post(sync_project).fallback(method_not_allowed))
        .route("/api/qbo/sync-multiple", post(sync_multiple).fallback(method_not_allowed))
        .route("/api/qbo/sync-all-projects", post(sync_all_projects).fallback(method_not_allowed))
        .route("/api/qbo/clear-and-resync", post(clear_and_resync).fallback(method_not_allowed))
        .route("/api/qbo/sync-invoice", post(sync_invoice).fallback(method_not_allowed))
        .route("/api/qbo/sync-billing", post(sync_billing).fallback(method_not_allowed))
        .route("/api/qbo/link-existing-invoices", post(link_existing_invoices).fallback(method_not_allowed))
        .route("/api/qbo/pull-payment", post(pull_payment).fallback(method_not_allowed))
        .route("/api/qbo/pull-vendors", post(pull_vendors).fallback(method_not_allowed))
        .route("/api/qbo/pull-customers", post(pull_customers).fallback(method_not_allowed))
        .route("/api/qbo/pull-subcontractors", post(pull_subcontractors).fallback(method_not_allowed))
        .route("/api/qbo/query", post(query).fallback(method_not_allowed))
        .route("/api/qbo/project-costs", get(project_costs).fallback(method_not_allowed))
        .route("/api/qbo/project-costs-cached", get(project_costs_cached).fallback(method_not_allowed))
        .route("/api/qbo/payroll-costs", get(payroll_costs).fallback(method_not_allowed))
        .route("/api/qbo/payroll-from-gl", get(payroll_from_gl).fallback(method_not_allowed))
        .route("/api/qbo/payroll-from-gl-cash", get(payroll_from_gl_cash).fallback(method_not_allowed))
        .route("/api/qbo/profit-loss-cash", get(profit_loss_cash).fallback(method_not_allowed))
        .route("/api/qbo/connect", get(connect).fallback(method_not_allowed))
        .route("/api/qbo/callback", get(callback).fallback(method_not_allowed))
        .route("/api/qbo/disconnect", post(disconnect).fallback(method_not_allowed))
        .route("/api/qbo/status", get(status).fallback(method_not_allowed))
        .with_state(runtime)
}

/// A JSON error body with its status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// `{"success": false, "error": ...}`
    fn failed(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            body: json!({ "success": false, "error": message.into() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// An empty body is read as a request without any fields
fn parse_body<T>(body: &Bytes) -> Result<T, ApiError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{field} is required")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Adds the fields of `extra` to the JSON object `value`
fn merged(mut value: Value, extra: Value) -> Value {
    if let (Some(target), Value::Object(fields)) = (value.as_object_mut(), extra) {
        target.extend(fields);
    }
    value
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SyncProjectRequest {
    engagement_id: Option<String>,
    #[serde(default)]
    create_if_not_found: bool,
}

async fn sync_project(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: SyncProjectRequest = parse_body(&body)?;
    let engagement_id = required(request.engagement_id, "engagementId")?;

    let result = runtime
        .engagement_sync()
        .sync_engagement(&engagement_id, request.create_if_not_found)
        .await;
    if !result.success {
        return Err(ApiError::failed(StatusCode::BAD_REQUEST, result.error.unwrap_or_default()));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Project synced to QuickBooks successfully",
        "customerId": result.customer_id,
        "jobId": result.job_id,
    })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SyncMultipleRequest {
    engagement_ids: Option<Value>,
}

/// The ids of an `engagementIds` array. Anything but an array of strings is rejected.
fn engagement_ids(value: Option<Value>) -> Result<Vec<String>, ApiError> {
    let missing = || ApiError::bad_request("engagementIds array is required");
    let Some(Value::Array(items)) = value else {
        return Err(missing());
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(id) => Ok(id),
            _ => Err(missing()),
        })
        .collect()
}

async fn sync_multiple(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: SyncMultipleRequest = parse_body(&body)?;
    let ids = engagement_ids(request.engagement_ids)?;

    let outcome = runtime.engagement_sync().sync_multiple(&ids).await;
    Ok(Json(json!({
        "success": outcome.success > 0,
        "message": format!("Synced {} of {} projects", outcome.success, ids.len()),
        "successCount": outcome.success,
        "failedCount": outcome.failed,
        "results": to_json(&outcome.results)?,
    })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SyncAllRequest {
    #[serde(default)]
    only_unsynced: bool,
}

async fn sync_all_projects(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: SyncAllRequest = parse_body(&body)?;
    let batch = runtime
        .engagement_sync()
        .sync_all_projects(request.only_unsynced)
        .await
        .map_err(|e| {
            error!("Error fetching projects: {e}");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch projects")
        })?;
    if batch.total_count == 0 {
        return Ok(Json(nothing_to_sync("No projects to sync")));
    }
    Ok(Json(to_json(&batch)?))
}

async fn clear_and_resync(State(runtime): State<AppState>) -> ApiResult {
    let batch = runtime
        .engagement_sync()
        .clear_and_resync()
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if batch.total_count == 0 {
        return Ok(Json(nothing_to_sync("No projects to sync")));
    }
    Ok(Json(to_json(&batch)?))
}

fn nothing_to_sync(message: &str) -> Value {
    json!({ "success": true, "syncedCount": 0, "message": message })
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PayAppRequest {
    pay_app_id: Option<String>,
}

async fn sync_invoice(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: PayAppRequest = parse_body(&body)?;
    let pay_app_id = required(request.pay_app_id, "payAppId")?;

    let result = runtime.invoice_sync().sync_pay_app(&pay_app_id).await;
    if !result.success {
        return Err(ApiError::failed(StatusCode::BAD_REQUEST, result.error.unwrap_or_default()));
    }
    Ok(Json(json!({
        "success": true,
        "invoiceId": result.invoice_id,
        "message": "Invoice synced successfully",
    })))
}

async fn pull_payment(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: PayAppRequest = parse_body(&body)?;
    let pay_app_id = required(request.pay_app_id, "payAppId")?;

    let result = runtime.invoice_sync().pull_payment(&pay_app_id).await;
    if !result.success {
        return Err(ApiError::failed(StatusCode::BAD_REQUEST, result.error.unwrap_or_default()));
    }
    Ok(Json(json!({
        "success": true,
        "paymentTotal": result.payment_total,
        "message": "Payment info updated successfully",
    })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct SyncBillingRequest {
    project_id: Option<String>,
}

async fn sync_billing(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: SyncBillingRequest = parse_body(&body)?;
    let project_id = required(request.project_id, "projectId")?;

    let batch = runtime
        .invoice_sync()
        .sync_billing(&project_id)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if batch.total_count == 0 {
        info!("No pay apps found for project: {project_id}");
        return Ok(Json(nothing_to_sync("No pay apps to sync")));
    }
    Ok(Json(to_json(&batch)?))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct EngagementRequest {
    engagement_id: Option<String>,
}

async fn link_existing_invoices(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: EngagementRequest = parse_body(&body)?;
    let engagement_id = required(request.engagement_id, "engagementId")?;

    match runtime.invoice_sync().link_existing_invoices(&engagement_id).await {
        Ok(result) => Ok(Json(to_json(&result)?)),
        Err(FloconError::NotFound(message)) => Err(ApiError::new(StatusCode::NOT_FOUND, message)),
        Err(FloconError::Sync(message)) => Err(ApiError::bad_request(message)),
        Err(e) => {
            error!("Error linking invoices of {engagement_id}: {e}");
            Err(ApiError::failed(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

async fn pull_vendors(State(runtime): State<AppState>) -> ApiResult {
    let result = runtime.party_pull().pull_vendors().await;
    if !result.success {
        return Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            result.error.unwrap_or_else(|| "Failed to pull vendors".to_string()),
        ));
    }
    Ok(Json(to_json(&result)?))
}

async fn pull_customers(State(runtime): State<AppState>) -> ApiResult {
    let result = runtime.party_pull().pull_customers().await;
    Ok(Json(to_json(&result)?))
}

async fn pull_subcontractors(State(runtime): State<AppState>) -> ApiResult {
    let result = runtime.party_pull().pull_subcontractors().await;
    if !result.success {
        let message = result
            .error
            .clone()
            .unwrap_or_else(|| "Failed to pull subcontractors".to_string());
        return Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: merged(to_json(&result)?, json!({ "error": message })),
        });
    }
    Ok(Json(to_json(&result)?))
}

#[derive(Deserialize, Default)]
struct QueryRequest {
    query: Option<String>,
}

async fn query(State(runtime): State<AppState>, body: Bytes) -> ApiResult {
    let request: QueryRequest = parse_body(&body)?;
    let query = required(request.query, "query")?;

    match runtime.qbo_query(&query).await {
        Ok(result) => Ok(Json(json!({ "success": true, "result": result }))),
        Err(e) => {
            error!("Query error: {e}");
            Err(ApiError::failed(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CostParams {
    qbo_job_id: Option<String>,
    engagement_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    force_refresh: Option<String>,
}

impl CostParams {
    fn job_id(&self) -> Result<String, ApiError> {
        required(self.qbo_job_id.clone(), "qboJobId")
    }

    fn range(&self) -> Result<DateRange, ApiError> {
        Ok(DateRange::new(
            date(self.start_date.as_deref(), "startDate")?,
            date(self.end_date.as_deref(), "endDate")?,
        ))
    }
}

fn date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{field} must be a YYYY-MM-DD date"))),
    }
}

/// Maps a failed cost report, payroll permission problems are a 403
fn cost_error(what: &str, job_id: &str, e: FloconError) -> ApiError {
    match e {
        FloconError::PayrollNotAuthorized => ApiError::new(StatusCode::FORBIDDEN, e.to_string()),
        e => {
            error!("Error fetching {what} of job {job_id}: {e}");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn project_costs(State(runtime): State<AppState>, Query(params): Query<CostParams>) -> ApiResult {
    let job_id = params.job_id()?;
    let costs = runtime
        .cost_reports()
        .project_costs(&job_id, params.range()?)
        .await
        .map_err(|e| cost_error("project costs", &job_id, e))?;
    Ok(Json(to_json(&costs)?))
}

async fn project_costs_cached(State(runtime): State<AppState>, Query(params): Query<CostParams>) -> ApiResult {
    let (Ok(job_id), Ok(engagement_id)) = (params.job_id(), required(params.engagement_id.clone(), "engagementId"))
    else {
        return Err(ApiError::bad_request("qboJobId and engagementId are required"));
    };
    let force_refresh = params.force_refresh.as_deref() == Some("true");
    let costs = runtime
        .cost_reports()
        .cached_project_costs(&engagement_id, &job_id, force_refresh)
        .await
        .map_err(|e| cost_error("cached costs", &job_id, e))?;
    Ok(Json(to_json(&costs)?))
}

async fn payroll_costs(State(runtime): State<AppState>, Query(params): Query<CostParams>) -> ApiResult {
    let job_id = params.job_id()?;
    let costs = runtime
        .cost_reports()
        .payroll_costs(&job_id, params.range()?)
        .await
        .map_err(|e| cost_error("payroll costs", &job_id, e))?;
    Ok(Json(to_json(&costs)?))
}

async fn payroll_from_gl(State(runtime): State<AppState>, Query(params): Query<CostParams>) -> ApiResult {
    let job_id = params.job_id()?;
    let payroll = runtime
        .cost_reports()
        .payroll_from_ledger(&job_id, params.range()?)
        .await
        .map_err(|e| cost_error("ledger payroll", &job_id, e))?;
    Ok(Json(to_json(&payroll)?))
}

async fn payroll_from_gl_cash(State(runtime): State<AppState>, Query(params): Query<CostParams>) -> ApiResult {
    let job_id = params.job_id()?;
    let costs = runtime
        .cost_reports()
        .cash_costs(&job_id, params.range()?)
        .await
        .map_err(|e| cost_error("cash basis costs", &job_id, e))?;
    Ok(Json(to_json(&costs)?))
}

async fn profit_loss_cash(State(runtime): State<AppState>, Query(params): Query<CostParams>) -> ApiResult {
    let job_id = params.job_id()?;
    let summary = runtime
        .cost_reports()
        .profit_loss(&job_id, params.range()?)
        .await
        .map_err(|e| cost_error("profit and loss", &job_id, e))?;
    Ok(Json(to_json(&summary)?))
}

async fn connect(State(runtime): State<AppState>) -> ApiResult {
    let auth_uri = runtime.token_service().connect_uri().map_err(|e| {
        error!("Error generating auth URI: {e}");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate authorization URL")
    })?;
    Ok(Json(json!({ "authUri": auth_uri })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CallbackParams {
    code: Option<String>,
    realm_id: Option<String>,
    error: Option<String>,
}

fn redirect(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

async fn callback(State(runtime): State<AppState>, Query(params): Query<CallbackParams>) -> Response {
    if let Some(oauth_error) = params.error.filter(|e| !e.is_empty()) {
        error!("OAuth error: {oauth_error}");
        return redirect(&format!(
            "{SETTINGS_PAGE}?qbo_error={}",
            urlencoding::encode(&oauth_error)
        ));
    }
    let (Some(code), Some(realm_id)) = (
        params.code.filter(|c| !c.is_empty()),
        params.realm_id.filter(|r| !r.is_empty()),
    ) else {
        return ApiError::bad_request("Missing required parameters").into_response();
    };

    match runtime
        .token_service()
        .complete_authorization(&code, &realm_id)
        .await
    {
        Ok(()) => redirect(&format!("{SETTINGS_PAGE}?qbo_connected=true")),
        Err(e) => {
            error!("Error during OAuth callback: {e}");
            redirect(&format!("{SETTINGS_PAGE}?qbo_error=connection_failed"))
        }
    }
}

async fn disconnect(State(runtime): State<AppState>) -> ApiResult {
    runtime.token_service().revoke().await.map_err(|e| {
        error!("Error disconnecting from QuickBooks: {e}");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to disconnect")
    })?;
    Ok(Json(json!({ "success": true, "message": "Disconnected from QuickBooks" })))
}

async fn status(State(runtime): State<AppState>) -> ApiResult {
    let status = runtime.token_service().connection_status().await.map_err(|e| {
        error!("Error checking QBO status: {e}");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to check connection status")
    })?;
    if !status.connected {
        return Ok(Json(json!({ "connected": false, "message": "Not connected to QuickBooks" })));
    }
    Ok(Json(to_json(&status)?))
}
