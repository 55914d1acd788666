//! Customer counter route handlers.
//!
//! The counter lists products, holds a cart against catalog stock, resolves
//! scanned or typed barcodes, and pays for one cart line at a time.

use apotek_core::{PaymentStatus, Product, QuantityChange, QuantityOp};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::views::{BarcodeRequest, CartResponse, CartView, ProductQuery, ProductView};
use crate::error::Result;
use crate::notify::Notification;
use crate::scanner::{ScanError, ScanEvent};
use crate::state::AppState;

/// Build the cart view under the session lock.
async fn cart_view(state: &AppState) -> CartView {
    CartView::from_store(&*state.session().read().await)
}

async fn cart_response(state: &AppState, notification: Option<Notification>) -> CartResponse {
    CartResponse {
        notification,
        cart: cart_view(state).await,
    }
}

/// Search the catalog from the counter.
///
/// GET /counter/products?q=
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<ProductView>> {
    let products = state.session().search_counter(&query.q).await;
    Json(query.rows(products))
}

/// Show the cart.
///
/// GET /counter/cart
pub async fn cart(State(state): State<AppState>) -> Json<CartView> {
    Json(cart_view(&state).await)
}

/// Add one unit of a product.
///
/// POST /counter/cart/add
#[instrument(skip(state, request), fields(barcode = %request.barcode))]
pub async fn add(
    State(state): State<AppState>,
    Json(request): Json<BarcodeRequest>,
) -> Result<Json<CartResponse>> {
    let line = state.session().add_to_cart(&request.barcode).await?;
    let notification =
        Notification::success("Product added", format!("{} added to the cart", line.name));
    Ok(Json(cart_response(&state, Some(notification)).await))
}

/// Request body for a quantity step.
#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub barcode: String,
    pub op: QuantityOp,
}

/// Step a line's quantity.
///
/// POST /counter/cart/update
#[instrument(skip(state, request), fields(barcode = %request.barcode, op = ?request.op))]
pub async fn update(
    State(state): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<CartResponse>> {
    let change = state
        .session()
        .update_quantity(&request.barcode, request.op)
        .await?;

    let notification = match change {
        QuantityChange::Incremented(_) | QuantityChange::Decremented(_) => None,
        QuantityChange::Removed(line) => Some(Notification::info(
            "Removed from cart",
            format!("{} removed from the cart", line.name),
        )),
        QuantityChange::Unchanged => Some(Notification::warning(
            "Out of stock",
            "No more stock is available for this product",
        )),
    };
    Ok(Json(cart_response(&state, notification).await))
}

/// Remove a line.
///
/// POST /counter/cart/remove
#[instrument(skip(state, request), fields(barcode = %request.barcode))]
pub async fn remove(
    State(state): State<AppState>,
    Json(request): Json<BarcodeRequest>,
) -> Result<Json<CartResponse>> {
    let removed = state.session().remove_from_cart(&request.barcode).await?;
    let notification = removed.map(|line| {
        Notification::info(
            "Removed from cart",
            format!("{} removed from the cart", line.name),
        )
    });
    Ok(Json(cart_response(&state, notification).await))
}

/// Result of resolving a barcode, from the scanner or typed in.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupResponse {
    Found {
        barcode: String,
        product: ProductView,
    },
    NotFound {
        barcode: String,
        notification: Notification,
    },
    Cancelled,
}

impl LookupResponse {
    fn resolved(barcode: String, product: Option<Product>) -> Self {
        match product {
            Some(product) => Self::Found {
                barcode,
                product: product.into(),
            },
            None => Self::NotFound {
                notification: Notification::warning(
                    "Product not found",
                    format!("No product for {barcode}"),
                ),
                barcode,
            },
        }
    }
}

/// Resolve a typed barcode.
///
/// POST /counter/lookup
pub async fn lookup(
    State(state): State<AppState>,
    Json(request): Json<BarcodeRequest>,
) -> Json<LookupResponse> {
    let barcode = request.barcode.trim().to_owned();
    let product = state.session().lookup(&barcode).await;
    Json(LookupResponse::resolved(barcode, product))
}

/// Decode once from the scanner and resolve the result.
///
/// POST /counter/scan
///
/// Holds the request open until a read arrives or the session is cancelled
/// through `/counter/scan/cancel`.
#[instrument(skip(state))]
pub async fn scan(State(state): State<AppState>) -> Result<Json<LookupResponse>> {
    let scanner = state.scanner()?;
    let ticket = state.scan_control().begin();

    match scanner.decode_once(ticket.token()).await {
        Ok(ScanEvent { barcode, product }) => Ok(Json(LookupResponse::resolved(barcode, product))),
        Err(ScanError::Cancelled) => Ok(Json(LookupResponse::Cancelled)),
        Err(e) => Err(e.into()),
    }
}

/// Response for a scan cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: usize,
}

/// Cancel every active decode session.
///
/// POST /counter/scan/cancel
pub async fn cancel_scan(State(state): State<AppState>) -> Json<CancelResponse> {
    Json(CancelResponse {
        cancelled: state.scan_control().cancel_all(),
    })
}

/// Response for a successful payment.
#[derive(Debug, Serialize)]
pub struct PayResponse {
    pub notification: Notification,
    pub status: PaymentStatus,
}

/// Pay for the cart line held for a barcode.
///
/// POST /counter/pay
///
/// On success the session is discarded after the configured delay. On
/// failure cart and catalog are left as they were.
#[instrument(skip(state, request), fields(barcode = %request.barcode))]
pub async fn pay(
    State(state): State<AppState>,
    Json(request): Json<BarcodeRequest>,
) -> Result<Json<PayResponse>> {
    let message = state.payments().pay_cart_line(&request.barcode).await?;
    Ok(Json(PayResponse {
        notification: Notification::success("Payment succeeded", message),
        status: state.payments().status(),
    }))
}

/// Current payment status.
///
/// GET /counter/payment
pub async fn payment(State(state): State<AppState>) -> Json<PaymentStatus> {
    Json(state.payments().status())
}
