//! Integration tests for Apotek Counter.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p apotek-integration-tests
//! ```
//!
//! No external services are needed: every test starts a [`MockCatalog`] on an
//! ephemeral port and points the counter at it.
//!
//! # Test Categories
//!
//! - `catalog_client` - Wire format of the catalog service calls
//! - `session_refresh` - Refresh policies and admin mirror updates
//! - `payment` - Payment submission and post-payment reload
//! - `counter_http` - The counter and admin HTTP surfaces end to end
//! - `scanning` - Decode sessions against a line device

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use apotek_core::{Barcode, Price, Product, ProductPatch, RefreshPolicy};
use apotek_counter::catalog_api::CatalogClient;
use apotek_counter::config::CounterConfig;
use apotek_counter::routes;
use apotek_counter::session::CatalogSession;
use apotek_counter::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// How the mock answers the next payment.
#[derive(Debug, Clone, Default)]
pub enum PayBehavior {
    /// Accept and decrement stock.
    #[default]
    Accept,
    /// Reject with a status and a JSON `{ "message": ... }` body.
    Reject { status: u16, message: String },
    /// Reject with a status and an empty body.
    RejectSilently { status: u16 },
}

/// A recorded payment submission.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PayCall {
    pub barcode: Barcode,
    pub quantity: u32,
}

#[derive(Default)]
struct MockState {
    products: Vec<Product>,
    payments: Vec<PayCall>,
    pay_behavior: PayBehavior,
    list_calls: usize,
    unavailable: bool,
    echo_edits: bool,
}

/// In-process stand-in for the remote catalog service.
///
/// Serves the same endpoints the counter calls and keeps products in memory.
/// Stops serving when dropped.
pub struct MockCatalog {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    shutdown: CancellationToken,
}

impl MockCatalog {
    /// Start the mock with the given products.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    #[allow(clippy::unwrap_used)]
    pub async fn start(products: Vec<Product>) -> Self {
        let state = Arc::new(Mutex::new(MockState {
            products,
            echo_edits: true,
            ..MockState::default()
        }));

        let app = Router::new()
            .route("/api/products", get(list_products))
            .route("/api/addProduct", post(add_product))
            .route("/api/editProduct/{barcode}", put(edit_product))
            .route("/api/deleteProduct/{barcode}", delete(delete_product))
            .route("/api/pay", post(pay))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await;
        });

        Self {
            addr,
            state,
            shutdown,
        }
    }

    /// Base URL of the mock.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn url(&self) -> url::Url {
        format!("http://{}/", self.addr).parse().unwrap()
    }

    /// Snapshot of the products held by the service.
    pub async fn products(&self) -> Vec<Product> {
        self.state.lock().await.products.clone()
    }

    /// Stock held by the service for `barcode`.
    pub async fn stock_of(&self, barcode: &str) -> Option<u32> {
        self.state
            .lock()
            .await
            .products
            .iter()
            .find(|p| p.barcode.as_str() == barcode)
            .map(|p| p.stock)
    }

    /// Replace the service's products, as another terminal would.
    pub async fn set_products(&self, products: Vec<Product>) {
        self.state.lock().await.products = products;
    }

    /// Choose how the next payments are answered.
    pub async fn set_pay_behavior(&self, behavior: PayBehavior) {
        self.state.lock().await.pay_behavior = behavior;
    }

    /// Answer edits with a bare confirmation instead of the product.
    pub async fn set_echo_edits(&self, echo: bool) {
        self.state.lock().await.echo_edits = echo;
    }

    /// Answer every product listing with 503.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Every payment received so far.
    pub async fn payments(&self) -> Vec<PayCall> {
        self.state.lock().await.payments.clone()
    }

    /// Number of product listings served.
    pub async fn list_calls(&self) -> usize {
        self.state.lock().await.list_calls
    }
}

impl Drop for MockCatalog {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

type Shared = State<Arc<Mutex<MockState>>>;

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

async fn list_products(State(state): Shared) -> Response {
    let mut state = state.lock().await;
    state.list_calls += 1;
    if state.unavailable {
        return message(StatusCode::SERVICE_UNAVAILABLE, "maintenance");
    }
    Json(state.products.clone()).into_response()
}

async fn add_product(State(state): Shared, Json(product): Json<Product>) -> Response {
    let mut state = state.lock().await;
    if state.products.iter().any(|p| p.barcode == product.barcode) {
        return message(StatusCode::CONFLICT, "Barcode sudah terdaftar");
    }
    state.products.push(product.clone());
    (StatusCode::CREATED, Json(product)).into_response()
}

async fn edit_product(
    State(state): Shared,
    Path(barcode): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Response {
    let mut state = state.lock().await;
    let echo = state.echo_edits;
    let Some(product) = state
        .products
        .iter_mut()
        .find(|p| p.barcode.as_str() == barcode)
    else {
        return message(StatusCode::NOT_FOUND, "Produk tidak ditemukan");
    };
    product.apply(&patch);
    if echo {
        Json(product.clone()).into_response()
    } else {
        message(StatusCode::OK, "Produk diperbarui")
    }
}

async fn delete_product(State(state): Shared, Path(barcode): Path<String>) -> Response {
    let mut state = state.lock().await;
    let before = state.products.len();
    state.products.retain(|p| p.barcode.as_str() != barcode);
    if state.products.len() == before {
        return message(StatusCode::NOT_FOUND, "Produk tidak ditemukan");
    }
    message(StatusCode::OK, "Produk dihapus")
}

async fn pay(State(state): Shared, Json(call): Json<PayCall>) -> Response {
    let mut state = state.lock().await;
    state.payments.push(call.clone());
    match state.pay_behavior.clone() {
        PayBehavior::Accept => {}
        PayBehavior::Reject { status, message: text } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_REQUEST);
            return message(status, &text);
        }
        PayBehavior::RejectSilently { status } => {
            return StatusCode::from_u16(status)
                .unwrap_or(StatusCode::BAD_REQUEST)
                .into_response();
        }
    }

    let Some(product) = state
        .products
        .iter_mut()
        .find(|p| p.barcode == call.barcode)
    else {
        return message(StatusCode::NOT_FOUND, "Produk tidak ditemukan");
    };
    let Some(rest) = product.stock.checked_sub(call.quantity) else {
        return message(StatusCode::BAD_REQUEST, "Stok tidak cukup");
    };
    product.stock = rest;
    message(StatusCode::OK, "Pembayaran berhasil")
}

// =============================================================================
// Fixtures
// =============================================================================

/// Build a product.
///
/// # Panics
///
/// Panics if `barcode` is not a valid barcode.
#[allow(clippy::unwrap_used)]
#[must_use]
pub fn product(barcode: &str, name: &str, price: u64, stock: u32) -> Product {
    Product {
        barcode: Barcode::parse(barcode).unwrap(),
        name: name.to_owned(),
        unit: "strip".to_owned(),
        price: Price::new(price),
        stock,
    }
}

/// A small pharmacy catalog.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    vec![
        product("8991001", "Paracetamol 500mg", 12_500, 5),
        product("8991002", "Amoxicillin 500mg", 27_000, 2),
        product("8991003", "Vitamin C 1000mg", 45_000, 0),
        product("8991004", "Obat Batuk Hitam", 15_000, 12),
    ]
}

/// Catalog client pointed at `mock`.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[allow(clippy::unwrap_used)]
#[must_use]
pub fn client_for(mock: &MockCatalog) -> CatalogClient {
    CatalogClient::new(mock.url(), Duration::from_secs(5)).unwrap()
}

/// A loaded session against `mock`.
///
/// # Panics
///
/// Panics if the initial refresh fails.
#[allow(clippy::unwrap_used)]
pub async fn session_for(mock: &MockCatalog, policy: RefreshPolicy) -> CatalogSession {
    let session = CatalogSession::new(client_for(mock), policy);
    session.refresh().await.unwrap();
    session
}

/// A counter server running against a mock catalog.
pub struct TestContext {
    pub catalog: MockCatalog,
    pub state: AppState,
    pub http: reqwest::Client,
    base_url: String,
    shutdown: CancellationToken,
}

impl TestContext {
    /// Start a mock catalog with `products` and a counter server in front of
    /// it, with the catalog already loaded.
    ///
    /// `settings` are extra configuration variables, e.g.
    /// `("PAYMENT_RELOAD_DELAY_MS", "0")`.
    ///
    /// # Panics
    ///
    /// Panics if a server fails to start or the initial refresh fails.
    #[allow(clippy::unwrap_used)]
    pub async fn start(products: Vec<Product>, settings: &[(&str, &str)]) -> Self {
        let catalog = MockCatalog::start(products).await;
        let api_url = catalog.url().to_string();
        let settings: Vec<(String, String)> = settings
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();

        let config = CounterConfig::from_source(|key| {
            if key == "CATALOG_API_URL" {
                return Some(api_url.clone());
            }
            settings
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
        .unwrap();

        let shutdown = CancellationToken::new();
        let state = AppState::new(&config, shutdown.clone()).unwrap();
        state.session().refresh().await.unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = routes::router(state.clone());
        let stop = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await;
        });

        Self {
            catalog,
            state,
            http: reqwest::Client::new(),
            base_url: format!("http://{addr}"),
            shutdown,
        }
    }

    /// Absolute URL for a counter path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a path and decode the JSON body.
    ///
    /// # Panics
    ///
    /// Panics on transport failure or a non-JSON body.
    #[allow(clippy::unwrap_used)]
    pub async fn get(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let response = self.http.get(self.url(path)).send().await.unwrap();
        decode(response).await
    }

    /// POST a JSON body to a path and decode the JSON response.
    ///
    /// # Panics
    ///
    /// Panics on transport failure or a non-JSON body.
    #[allow(clippy::unwrap_used)]
    pub async fn post(&self, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = self.http.post(self.url(path)).json(&body).send().await.unwrap();
        decode(response).await
    }

    /// PUT a JSON body to a path and decode the JSON response.
    ///
    /// # Panics
    ///
    /// Panics on transport failure or a non-JSON body.
    #[allow(clippy::unwrap_used)]
    pub async fn put(&self, path: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = self.http.put(self.url(path)).json(&body).send().await.unwrap();
        decode(response).await
    }

    /// DELETE a path and decode the JSON response.
    ///
    /// # Panics
    ///
    /// Panics on transport failure or a non-JSON body.
    #[allow(clippy::unwrap_used)]
    pub async fn delete(&self, path: &str) -> (StatusCode, serde_json::Value) {
        let response = self.http.delete(self.url(path)).send().await.unwrap();
        decode(response).await
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[allow(clippy::unwrap_used)]
async fn decode(response: reqwest::Response) -> (StatusCode, serde_json::Value) {
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    let body = response.json().await.unwrap();
    (status, body)
}
