//! HTTP route handlers for the counter.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (catalog service reachable)
//!
//! # Counter (customer surface)
//! GET    /counter/products?q=       - Search products (per-surface query)
//! GET    /counter/cart              - Cart lines and totals
//! POST   /counter/cart/add          - Add one unit
//! POST   /counter/cart/update       - Increment or decrement a line
//! POST   /counter/cart/remove       - Remove a line
//! POST   /counter/lookup            - Resolve a typed barcode
//! POST   /counter/scan              - Decode once from the scanner
//! POST   /counter/scan/cancel       - Cancel active decode sessions
//! POST   /counter/pay               - Pay for one cart line
//! GET    /counter/payment           - Payment status
//! POST   /counter/refresh           - Reload the catalog
//!
//! # Admin
//! GET    /admin/products?q=         - Search products (per-surface query)
//! POST   /admin/products            - Add a product
//! PUT    /admin/products/{barcode}  - Edit a product
//! DELETE /admin/products/{barcode}  - Delete a product
//! GET    /admin/scan/stream         - Continuous decode (SSE)
//! POST   /admin/refresh             - Reload the catalog
//! ```

pub mod admin;
pub mod counter;
pub mod views;

use apotek_core::RefreshReport;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::notify::Notification;
use crate::state::AppState;

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/counter", counter_routes())
        .nest("/admin", admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create the customer counter routes router.
pub fn counter_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(counter::products))
        .route("/cart", get(counter::cart))
        .route("/cart/add", post(counter::add))
        .route("/cart/update", post(counter::update))
        .route("/cart/remove", post(counter::remove))
        .route("/lookup", post(counter::lookup))
        .route("/scan", post(counter::scan))
        .route("/scan/cancel", post(counter::cancel_scan))
        .route("/pay", post(counter::pay))
        .route("/payment", get(counter::payment))
        .route("/refresh", post(refresh))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(admin::products).post(admin::create))
        .route(
            "/products/{barcode}",
            put(admin::update).delete(admin::delete),
        )
        .route("/scan/stream", get(admin::scan_stream))
        .route("/refresh", post(refresh))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the catalog service is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.session().client().list_products().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Response for a catalog reload.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub notification: Notification,
    pub report: RefreshReport,
}

/// Reload the catalog from the service.
///
/// POST /counter/refresh, POST /admin/refresh
async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>> {
    let report = state.session().refresh().await?;

    let notification = if report.adjustments.is_empty() {
        Notification::success("Catalog refreshed", format!("{} products loaded", report.products))
    } else {
        Notification::warning(
            "Catalog refreshed",
            format!(
                "{} products loaded; {} cart lines adjusted to current stock",
                report.products,
                report.adjustments.len()
            ),
        )
    };

    Ok(Json(RefreshResponse {
        notification,
        report,
    }))
}
