//! Admin catalog route handlers.
//!
//! Product changes go to the catalog service first; the local mirror is only
//! updated once the service acknowledges them.

use std::convert::Infallible;

use apotek_core::{ProductForm, ProductPatchForm};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::instrument;

use super::views::{ProductQuery, ProductView};
use crate::error::Result;
use crate::notify::Notification;
use crate::state::AppState;

/// Search the catalog from the admin dashboard.
///
/// GET /admin/products?q=
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<ProductView>> {
    let products = state.session().search_admin(&query.q).await;
    Json(query.rows(products))
}

/// A product change result.
#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub notification: Notification,
    pub product: ProductView,
}

/// Add a product.
///
/// POST /admin/products
#[instrument(skip(state, form))]
pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    let product = state.session().add_product(&form).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            notification: Notification::success(
                "Product added",
                format!("{} was added to the catalog", product.name),
            ),
            product: product.into(),
        }),
    ))
}

/// Edit a product.
///
/// PUT /admin/products/{barcode}
#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
    Json(form): Json<ProductPatchForm>,
) -> Result<Json<ProductResponse>> {
    let product = state.session().edit_product(&barcode, &form).await?;
    Ok(Json(ProductResponse {
        notification: Notification::success(
            "Product updated",
            format!("{} was updated", product.name),
        ),
        product: product.into(),
    }))
}

/// Delete a product.
///
/// DELETE /admin/products/{barcode}
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<Notification>> {
    let ack = state.session().delete_product(&barcode).await?;
    Ok(Json(Notification::success(
        "Product deleted",
        ack.message
            .unwrap_or_else(|| format!("{barcode} was removed from the catalog")),
    )))
}

/// Decode continuously and stream every resolved read.
///
/// GET /admin/scan/stream
///
/// The stream holds the scanner until the client disconnects, the session is
/// cancelled through `/counter/scan/cancel`, or the server shuts down.
pub async fn scan_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let scanner = state.scanner()?;
    let ticket = state.scan_control().begin();
    let reads = scanner.decode_continuous(ticket.token());

    let events = async_stream::stream! {
        // Deregisters the session when the stream ends or is dropped
        let _ticket = ticket;
        let mut reads = std::pin::pin!(reads);

        while let Some(read) = reads.next().await {
            let event = match read {
                Ok(scan) => Event::default()
                    .event("scan")
                    .json_data(&scan)
                    .unwrap_or_else(|_| Event::default().event("scan").data(scan.barcode)),
                Err(e) => Event::default()
                    .event("error")
                    .json_data(Notification::warning("Scanner", e.to_string()))
                    .unwrap_or_else(|_| Event::default().event("error").data(e.to_string())),
            };
            yield Ok(event);
        }
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
