use crate::api::AppState;
use crate::db::queries;
use crate::error::LedgerError;
use crate::models::{
    Client, ClientTotal, DateRange, Invoice, InvoiceLineItem, ServiceTotal, TableCounts,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 统一响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(message: String, data: T) -> Response {
        let response = Self {
            success: true,
            message,
            data: Some(data),
        };
        (StatusCode::OK, Json(response)).into_response()
    }
}

/// 错误到 HTTP 状态码的映射
pub struct ApiError(pub LedgerError);

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
            e if e.is_bad_input() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }
        let response = ApiResponse::<()> {
            success: false,
            message: format!("Error: {}", self.0),
            data: None,
        };
        (status, Json(response)).into_response()
    }
}

type ApiResult = Result<Response, ApiError>;

#[derive(Debug, Deserialize)]
pub struct ClientFilter {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OverdueQuery {
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct YearQuery {
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: i32,
    pub month: u32,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn stats(State(state): State<AppState>) -> ApiResult {
    let counts: TableCounts = queries::table_counts(&state.pool).await?;
    Ok(ApiResponse::ok("table counts".to_string(), counts))
}

/// 全部客户，或按国家筛选
pub async fn list_clients(
    State(state): State<AppState>,
    Query(filter): Query<ClientFilter>,
) -> ApiResult {
    let clients: Vec<Client> = match filter.country.as_deref() {
        Some(country) => queries::clients_by_country(&state.pool, country).await?,
        None => queries::list_clients(&state.pool).await?,
    };
    Ok(ApiResponse::ok(format!("{} clients", clients.len()), clients))
}

/// 某客户在日期区间内的发票
pub async fn client_invoices(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Query(range): Query<DateRange>,
) -> ApiResult {
    if queries::get_client(&state.pool, &client_id).await?.is_none() {
        return Err(LedgerError::NotFound(format!("client {}", client_id)).into());
    }
    let invoices: Vec<Invoice> =
        queries::invoices_for_client(&state.pool, &client_id, range).await?;
    Ok(ApiResponse::ok(format!("{} invoices", invoices.len()), invoices))
}

pub async fn invoices_by_status(
    State(state): State<AppState>,
    Query(filter): Query<StatusFilter>,
) -> ApiResult {
    let invoices = queries::invoices_by_status(&state.pool, &filter.status).await?;
    Ok(ApiResponse::ok(format!("{} invoices", invoices.len()), invoices))
}

/// 逾期发票，as_of 缺省为当天
pub async fn overdue_invoices(
    State(state): State<AppState>,
    Query(query): Query<OverdueQuery>,
) -> ApiResult {
    let as_of = query
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let invoices = queries::overdue_invoices(&state.pool, as_of).await?;
    Ok(ApiResponse::ok(
        format!("{} invoices overdue as of {}", invoices.len(), as_of),
        invoices,
    ))
}

pub async fn invoice_line_items(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> ApiResult {
    if queries::get_invoice(&state.pool, &invoice_id).await?.is_none() {
        return Err(LedgerError::NotFound(format!("invoice {}", invoice_id)).into());
    }
    let items: Vec<InvoiceLineItem> =
        queries::line_items_for_invoice(&state.pool, &invoice_id).await?;
    Ok(ApiResponse::ok(format!("{} line items", items.len()), items))
}

pub async fn service_line_items(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
) -> ApiResult {
    let items = queries::line_items_by_service(&state.pool, &service_name).await?;
    Ok(ApiResponse::ok(format!("{} line items", items.len()), items))
}

/// 某月开票的发票，month 超出 1..=12 返回 400
pub async fn invoices_by_month(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult {
    let invoices = queries::invoices_for_month(&state.pool, query.year, query.month).await?;
    Ok(ApiResponse::ok(
        format!("{} invoices in {}-{:02}", invoices.len(), query.year, query.month),
        invoices,
    ))
}

pub async fn client_totals(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult {
    let totals: Vec<ClientTotal> = queries::client_totals_for_year(&state.pool, query.year).await?;
    Ok(ApiResponse::ok(
        format!("{} clients invoiced in {}", totals.len(), query.year),
        totals,
    ))
}

/// 年度开票金额最高的客户；没有可计价明细时 data 为 null
pub async fn top_client(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
) -> ApiResult {
    let top = queries::top_client_for_year(&state.pool, query.year).await?;
    let message = match &top {
        Some(t) => format!("top client in {}: {}", query.year, t.client_id),
        None => format!("no priced line items in {}", query.year),
    };
    Ok(ApiResponse::ok(message, top))
}

pub async fn service_totals(State(state): State<AppState>) -> ApiResult {
    let totals: Vec<ServiceTotal> = queries::service_totals(&state.pool).await?;
    Ok(ApiResponse::ok(format!("{} services", totals.len()), totals))
}
