//! Integration tests for the counter and admin HTTP surfaces.
//!
//! Each test runs a real counter server in front of the mock catalog and
//! talks to it over HTTP.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::{Value, json};

use apotek_integration_tests::{PayBehavior, TestContext, sample_catalog};

async fn context() -> TestContext {
    TestContext::start(sample_catalog(), &[("PAYMENT_RELOAD_DELAY_MS", "0")]).await
}

fn barcodes(rows: &Value) -> Vec<&str> {
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["barcode"].as_str().unwrap())
        .collect()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_readiness_with_catalog_service() {
    let ctx = context().await;
    let response = ctx.http.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    ctx.catalog.set_unavailable(true).await;
    let response = ctx.http.get(ctx.url("/health/ready")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 503);
}

// =============================================================================
// Product listing
// =============================================================================

#[tokio::test]
async fn test_product_search_and_sort() {
    let ctx = context().await;

    let (status, rows) = ctx.get("/counter/products?q=500mg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(barcodes(&rows), vec!["8991001", "8991002"]);

    let (_, rows) = ctx.get("/counter/products?sort=price&order=desc").await;
    assert_eq!(
        barcodes(&rows),
        vec!["8991003", "8991002", "8991004", "8991001"]
    );

    let first = &rows[0];
    assert_eq!(first["price_display"], "Rp 45.000");
    assert_eq!(first["in_stock"], false);
}

#[tokio::test]
async fn test_admin_query_does_not_disturb_counter_query() {
    let ctx = context().await;

    ctx.get("/counter/products?q=batuk").await;
    let (_, admin) = ctx.get("/admin/products?q=vitamin").await;
    assert_eq!(barcodes(&admin), vec!["8991003"]);

    let store = ctx.state.session().read().await;
    assert_eq!(store.counter_search.query(), "batuk");
    assert_eq!(store.admin_search.query(), "vitamin");
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_flow() {
    let ctx = context().await;

    let (status, body) = ctx
        .post("/counter/cart/add", json!({ "barcode": "8991002" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["level"], "success");
    assert_eq!(body["cart"]["total_items"], 1);
    assert_eq!(body["cart"]["items"][0]["stock_remaining"], 1);

    let (_, body) = ctx
        .post(
            "/counter/cart/update",
            json!({ "barcode": "8991002", "op": "increment" }),
        )
        .await;
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);
    assert_eq!(body["cart"]["items"][0]["can_increment"], false);
    assert_eq!(body["cart"]["total_price"], 54_000);
    assert_eq!(body["cart"]["total_price_display"], "Rp 54.000");

    // Stock is exhausted: the line stays as it is
    let (status, body) = ctx
        .post(
            "/counter/cart/update",
            json!({ "barcode": "8991002", "op": "increment" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["title"], "Out of stock");
    assert_eq!(body["cart"]["items"][0]["quantity"], 2);

    let (_, body) = ctx
        .post("/counter/cart/remove", json!({ "barcode": "8991002" }))
        .await;
    assert_eq!(body["notification"]["level"], "info");
    assert_eq!(body["cart"]["items"], json!([]));
    assert_eq!(
        ctx.state.session().lookup("8991002").await.unwrap().stock,
        2
    );
}

#[tokio::test]
async fn test_decrement_to_zero_removes_line() {
    let ctx = context().await;
    ctx.post("/counter/cart/add", json!({ "barcode": "8991004" }))
        .await;

    let (_, body) = ctx
        .post(
            "/counter/cart/update",
            json!({ "barcode": "8991004", "op": "decrement" }),
        )
        .await;

    assert_eq!(body["notification"]["title"], "Removed from cart");
    assert_eq!(body["cart"]["total_items"], 0);
}

#[tokio::test]
async fn test_add_out_of_stock_product() {
    let ctx = context().await;

    let (status, body) = ctx
        .post("/counter/cart/add", json!({ "barcode": "8991003" }))
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["title"], "Out of stock");
}

#[tokio::test]
async fn test_lookup() {
    let ctx = context().await;

    let (_, found) = ctx
        .post("/counter/lookup", json!({ "barcode": " 8991001\r\n" }))
        .await;
    assert_eq!(found["status"], "found");
    assert_eq!(found["barcode"], "8991001");
    assert_eq!(found["product"]["name"], "Paracetamol 500mg");

    let (_, missing) = ctx
        .post("/counter/lookup", json!({ "barcode": "0000000" }))
        .await;
    assert_eq!(missing["status"], "not_found");
    assert_eq!(missing["notification"]["title"], "Product not found");
}

// =============================================================================
// Payment
// =============================================================================

#[tokio::test]
async fn test_pay_then_session_resets() {
    let ctx = context().await;
    ctx.post("/counter/cart/add", json!({ "barcode": "8991001" }))
        .await;
    ctx.post("/counter/cart/add", json!({ "barcode": "8991004" }))
        .await;

    let (status, body) = ctx
        .post("/counter/pay", json!({ "barcode": "8991001" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["state"], "succeeded");
    assert_eq!(body["notification"]["description"], "Pembayaran berhasil");

    ctx.state.payments().settle().await;

    let (_, cart) = ctx.get("/counter/cart").await;
    assert_eq!(cart["total_items"], 0);
    assert_eq!(ctx.catalog.stock_of("8991001").await, Some(4));
    assert_eq!(ctx.catalog.stock_of("8991004").await, Some(12));
}

#[tokio::test]
async fn test_failed_reload_after_payment_is_shown_on_cart() {
    let ctx = TestContext::start(sample_catalog(), &[("PAYMENT_RELOAD_DELAY_MS", "200")]).await;
    ctx.post("/counter/cart/add", json!({ "barcode": "8991001" }))
        .await;
    let (status, _) = ctx
        .post("/counter/pay", json!({ "barcode": "8991001" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx
        .post("/counter/pay", json!({ "barcode": "8991001" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["level"], "warning");
    assert_eq!(ctx.catalog.payments().await.len(), 1);

    ctx.catalog.set_unavailable(true).await;
    ctx.state.payments().settle().await;

    let (_, cart) = ctx.get("/counter/cart").await;
    assert_eq!(cart["total_items"], 0);
    assert_eq!(cart["catalog_notice"]["level"], "error");
    assert_eq!(cart["catalog_notice"]["title"], "Catalog unavailable");

    ctx.catalog.set_unavailable(false).await;
    ctx.state.session().refresh().await.unwrap();
    let (_, cart) = ctx.get("/counter/cart").await;
    assert!(cart.get("catalog_notice").is_none());
}

#[tokio::test]
async fn test_failed_payment_is_reported() {
    let ctx = context().await;
    ctx.post("/counter/cart/add", json!({ "barcode": "8991001" }))
        .await;
    ctx.catalog
        .set_pay_behavior(PayBehavior::Reject {
            status: 400,
            message: "Stok tidak cukup".to_owned(),
        })
        .await;

    let (status, body) = ctx
        .post("/counter/pay", json!({ "barcode": "8991001" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["title"], "Payment failed");
    assert_eq!(body["description"], "Stok tidak cukup");

    let (_, payment) = ctx.get("/counter/payment").await;
    assert_eq!(payment["state"], "failed");

    let (_, cart) = ctx.get("/counter/cart").await;
    assert_eq!(cart["total_items"], 1);
}

#[tokio::test]
async fn test_pay_for_line_not_in_cart() {
    let ctx = context().await;

    let (status, _) = ctx
        .post("/counter/pay", json!({ "barcode": "8991001" }))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(ctx.catalog.payments().await.is_empty());
}

// =============================================================================
// Admin
// =============================================================================

#[tokio::test]
async fn test_admin_product_lifecycle() {
    let ctx = context().await;

    let (status, body) = ctx
        .post(
            "/admin/products",
            json!({
                "barcode": "8995555",
                "name": "Antasida Doen",
                "unit": "strip",
                "price": 8000,
                "stock": "30"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["product"]["price_display"], "Rp 8.000");

    let (status, body) = ctx
        .put("/admin/products/8995555", json!({ "stock": 25 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["product"]["stock"], 25);

    let (status, body) = ctx.delete("/admin/products/8995555").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Produk dihapus");

    let (_, rows) = ctx.get("/admin/products?q=antasida").await;
    assert_eq!(rows, json!([]));
}

#[tokio::test]
async fn test_admin_validation_error_lists_fields() {
    let ctx = context().await;

    let (status, body) = ctx
        .post("/admin/products", json!({ "barcode": "8995555", "name": "" }))
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["title"], "Input error");
    assert!(body["description"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn test_admin_duplicate_product_shows_service_message() {
    let ctx = context().await;

    let (status, body) = ctx
        .post(
            "/admin/products",
            json!({
                "barcode": "8991001",
                "name": "Paracetamol",
                "unit": "strip",
                "price": "1",
                "stock": "1"
            }),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["title"], "Request refused");
    assert_eq!(body["description"], "Barcode sudah terdaftar");
}

#[tokio::test]
async fn test_refresh_reports_adjustments() {
    let ctx = context().await;
    ctx.post("/counter/cart/add", json!({ "barcode": "8991002" }))
        .await;
    ctx.post("/counter/cart/add", json!({ "barcode": "8991002" }))
        .await;

    let mut products = sample_catalog();
    products.retain(|p| p.barcode.as_str() != "8991002");
    ctx.catalog.set_products(products).await;

    let (status, body) = ctx.post("/admin/refresh", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notification"]["level"], "warning");
    assert_eq!(body["report"]["products"], 3);
    assert_eq!(body["report"]["adjustments"][0]["kind"], "dropped");
    assert_eq!(body["report"]["adjustments"][0]["held"], 2);

    let (_, cart) = ctx.get("/counter/cart").await;
    assert_eq!(cart["total_items"], 0);
}
