pub mod handlers;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use sqlx::PgPool;
use std::time::Instant;
use tower::ServiceBuilder;

pub use handlers::*;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

/// 只读查询路由
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/stats", get(stats))
        .route("/api/clients", get(list_clients))
        .route("/api/clients/totals", get(client_totals))
        .route("/api/clients/top", get(top_client))
        .route("/api/clients/:client_id/invoices", get(client_invoices))
        .route("/api/invoices", get(invoices_by_status))
        .route("/api/invoices/overdue", get(overdue_invoices))
        .route("/api/invoices/by-month", get(invoices_by_month))
        .route("/api/invoices/:invoice_id/line-items", get(invoice_line_items))
        .route("/api/services/totals", get(service_totals))
        .route("/api/services/:service_name/line-items", get(service_line_items))
        .layer(ServiceBuilder::new().layer(middleware::from_fn(log_request)))
        .with_state(state)
}

/// 记录每个请求的方法、路径、状态码和耗时
async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        "{} {} -> {} ({:?})",
        method,
        uri,
        response.status().as_u16(),
        start.elapsed()
    );
    response
}
