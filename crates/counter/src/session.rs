//! The counter's shared catalog session.
//!
//! One [`Store`] holds the inventory (catalog mirror plus cart) and the search
//! state of both surfaces. It sits behind a single lock, so every cart
//! operation and its paired stock adjustment happen in one critical section.
//! Network calls never run while the lock is held: data is fetched first and
//! applied afterwards.

use std::sync::Arc;

use apotek_core::{
    Barcode, CartError, CartItem, CatalogError, Inventory, Product, ProductForm, ProductPatchForm,
    QuantityChange, QuantityOp, RefreshPolicy, RefreshReport, SearchFilter, ValidationError,
};
use thiserror::Error;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info, instrument, warn};

use crate::catalog_api::{Ack, CatalogApiError, CatalogClient};

/// Errors from admin catalog management.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input rejected locally; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The catalog service call failed; the mirror is unchanged.
    #[error(transparent)]
    Api(#[from] CatalogApiError),

    /// The mirror could not apply an acknowledged change.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Everything guarded by the session lock.
#[derive(Debug, Default)]
pub struct Store {
    pub inventory: Inventory,
    pub counter_search: SearchFilter,
    pub admin_search: SearchFilter,
    /// Why the last catalog load failed; cleared by the next good load.
    pub load_error: Option<String>,
}

impl Store {
    fn new(policy: RefreshPolicy) -> Self {
        Self {
            inventory: Inventory::new(policy),
            counter_search: SearchFilter::new(),
            admin_search: SearchFilter::new(),
            load_error: None,
        }
    }

    /// Recompute both surfaces' results after a catalog change.
    fn recompute(&mut self) {
        self.counter_search.recompute(self.inventory.catalog());
        self.admin_search.recompute(self.inventory.catalog());
    }
}

/// Shared handle to the catalog mirror, cart and search state.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct CatalogSession {
    client: CatalogClient,
    store: Arc<RwLock<Store>>,
}

impl CatalogSession {
    /// Create an empty session. Call [`CatalogSession::refresh`] to load it.
    #[must_use]
    pub fn new(client: CatalogClient, policy: RefreshPolicy) -> Self {
        Self {
            client,
            store: Arc::new(RwLock::new(Store::new(policy))),
        }
    }

    /// The catalog service client.
    #[must_use]
    pub const fn client(&self) -> &CatalogClient {
        &self.client
    }

    /// Lock the store for reading.
    pub async fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().await
    }

    async fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().await
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the catalog and reconcile the cart per the refresh policy.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; inventory and search are left untouched and
    /// the failure is recorded as [`Store::load_error`].
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<RefreshReport, CatalogApiError> {
        let products = match self.client.list_products().await {
            Ok(products) => products,
            Err(e) => {
                self.record_load_error(&e).await;
                return Err(e);
            }
        };

        let mut store = self.write().await;
        let report = store.inventory.load(products);
        store.recompute();
        store.load_error = None;
        drop(store);

        for adjustment in &report.adjustments {
            warn!(?adjustment, "cart line adjusted to fresh stock");
        }
        info!(products = report.products, policy = %report.policy, "catalog loaded");
        Ok(report)
    }

    /// Start a fresh session: drop the cart and reload the catalog.
    ///
    /// The cart is discarded even if the fetch fails, in which case the
    /// catalog is left empty until the next successful refresh and the
    /// failure is recorded as [`Store::load_error`].
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    #[instrument(skip(self))]
    pub async fn discard_and_reload(&self) -> Result<usize, CatalogApiError> {
        let fetched = self.client.list_products().await;

        let mut store = self.write().await;
        let (products, result) = match fetched {
            Ok(products) => {
                let count = products.len();
                (products, Ok(count))
            }
            Err(e) => (Vec::new(), Err(e)),
        };
        let discarded = store.inventory.reset(products);
        store.recompute();
        store.load_error = result.as_ref().err().map(ToString::to_string);
        drop(store);

        info!(discarded_lines = discarded.len(), "session discarded");
        result
    }

    /// Why the last catalog load failed, if it did.
    pub async fn load_error(&self) -> Option<String> {
        self.read().await.load_error.clone()
    }

    async fn record_load_error(&self, err: &CatalogApiError) {
        error!(error = %err, "catalog load failed");
        self.write().await.load_error = Some(err.to_string());
    }

    // =========================================================================
    // Counter
    // =========================================================================

    /// Search the counter surface.
    pub async fn search_counter(&self, query: &str) -> Vec<Product> {
        let mut store = self.write().await;
        let Store {
            inventory,
            counter_search,
            ..
        } = &mut *store;
        counter_search.set_query(inventory.catalog(), query).to_vec()
    }

    /// Resolve scanned or typed text to a product.
    pub async fn lookup(&self, barcode: &str) -> Option<Product> {
        self.read().await.inventory.lookup(barcode).cloned()
    }

    /// Add one unit of a product to the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] with the store unchanged.
    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, barcode: &str) -> Result<CartItem, CartError> {
        self.mutate_cart(|inventory| inventory.add_to_cart(barcode.trim()))
            .await
    }

    /// Step a cart line's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] with the store unchanged.
    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        barcode: &str,
        op: QuantityOp,
    ) -> Result<QuantityChange, CartError> {
        self.mutate_cart(|inventory| inventory.update_quantity(barcode.trim(), op))
            .await
    }

    /// Remove a cart line, returning its units to stock.
    ///
    /// # Errors
    ///
    /// Returns [`CartError`] with the store unchanged.
    #[instrument(skip(self))]
    pub async fn remove_from_cart(&self, barcode: &str) -> Result<Option<CartItem>, CartError> {
        self.mutate_cart(|inventory| inventory.remove_from_cart(barcode.trim()))
            .await
    }

    async fn mutate_cart<T>(
        &self,
        op: impl FnOnce(&mut Inventory) -> Result<T, CartError>,
    ) -> Result<T, CartError> {
        let mut store = self.write().await;
        let result = op(&mut store.inventory)?;
        // Stock counts are searchable, so results go stale on every move
        store.recompute();
        Ok(result)
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Search the admin surface.
    pub async fn search_admin(&self, query: &str) -> Vec<Product> {
        let mut store = self.write().await;
        let Store {
            inventory,
            admin_search,
            ..
        } = &mut *store;
        admin_search.set_query(inventory.catalog(), query).to_vec()
    }

    /// Validate and create a product, then mirror it locally.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call, or the service
    /// error with the mirror unchanged.
    #[instrument(skip(self, form), fields(barcode = %form.barcode))]
    pub async fn add_product(&self, form: &ProductForm) -> Result<Product, SessionError> {
        let product = form.validate()?;
        let created = self.client.add_product(&product).await?;

        let mut store = self.write().await;
        if let Some(adjustment) = store.inventory.upsert_product(created.clone()) {
            warn!(?adjustment, "cart line adjusted to fresh stock");
        }
        store.recompute();
        drop(store);

        info!(barcode = %created.barcode, "product added");
        Ok(created)
    }

    /// Validate and apply an edit, then mirror it locally.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any network call, or the service
    /// error with the mirror unchanged.
    #[instrument(skip(self, form))]
    pub async fn edit_product(
        &self,
        barcode: &str,
        form: &ProductPatchForm,
    ) -> Result<Product, SessionError> {
        let barcode = Barcode::parse(barcode).map_err(ValidationError::from)?;
        let patch = form.validate()?;
        let echoed = self.client.edit_product(&barcode, &patch).await?;

        let mut store = self.write().await;
        let (product, adjustment) = match echoed {
            Some(product) => {
                let adjustment = store.inventory.upsert_product(product.clone());
                (product, adjustment)
            }
            None => store.inventory.patch_product(&barcode, &patch)?,
        };
        if let Some(adjustment) = adjustment {
            warn!(?adjustment, "cart line adjusted to fresh stock");
        }
        store.recompute();
        drop(store);

        info!(barcode = %barcode, "product updated");
        Ok(product)
    }

    /// Delete a product, dropping its cart line if one is held.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed barcode, or the service
    /// error with the mirror unchanged.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, barcode: &str) -> Result<Ack, SessionError> {
        let barcode = Barcode::parse(barcode).map_err(ValidationError::from)?;
        let ack = self.client.delete_product(&barcode).await?;

        let mut store = self.write().await;
        let (_, line) = store.inventory.remove_product(barcode.as_str());
        store.recompute();
        drop(store);

        if let Some(line) = line {
            warn!(barcode = %barcode, held = line.quantity, "deleted product dropped from cart");
        }
        info!(barcode = %barcode, "product deleted");
        Ok(ack)
    }
}
