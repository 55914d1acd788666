//! Catalog and cart guarded as one unit.
//!
//! [`Inventory`] owns both stores so that any lock placed around it covers
//! every paired adjustment. It also decides what happens to held cart
//! quantities when fresh stock arrives from the catalog service, according to
//! its [`RefreshPolicy`].

use serde::Serialize;

use crate::cart::{CartError, CartStore, QuantityChange};
use crate::catalog::{CatalogError, ProductCatalog};
use crate::types::{Barcode, CartItem, CartTotals, Product, ProductPatch, QuantityOp, RefreshPolicy};

/// A change made to a cart line while reconciling against fresh stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReservationAdjustment {
    /// Fresh stock covers only part of the held quantity.
    Shrunk {
        barcode: Barcode,
        held: u32,
        kept: u32,
    },
    /// The line was removed: its product is gone or has no stock left.
    Dropped { barcode: Barcode, held: u32 },
}

/// Summary of a catalog load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Products now loaded.
    pub products: usize,
    /// Policy applied to held quantities.
    pub policy: RefreshPolicy,
    /// Lines changed by the reconciliation, in cart order.
    pub adjustments: Vec<ReservationAdjustment>,
}

/// The session's catalog mirror and cart.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    catalog: ProductCatalog,
    cart: CartStore,
    policy: RefreshPolicy,
}

impl Inventory {
    /// Create an empty inventory.
    #[must_use]
    pub const fn new(policy: RefreshPolicy) -> Self {
        Self {
            catalog: ProductCatalog::new(),
            cart: CartStore::new(),
            policy,
        }
    }

    /// The catalog mirror.
    #[must_use]
    pub const fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// The cart.
    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// The refresh policy.
    #[must_use]
    pub const fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Look up scanned or typed text.
    #[must_use]
    pub fn lookup(&self, barcode: &str) -> Option<&Product> {
        self.catalog.find_by_barcode(barcode.trim())
    }

    /// Add one unit to the cart. See [`CartStore::add_item`].
    ///
    /// # Errors
    ///
    /// Propagates [`CartError`] with both stores unchanged.
    pub fn add_to_cart(&mut self, barcode: &str) -> Result<CartItem, CartError> {
        self.cart.add_item(&mut self.catalog, barcode).cloned()
    }

    /// Step a line's quantity. See [`CartStore::update_quantity`].
    ///
    /// # Errors
    ///
    /// Propagates [`CartError`] with both stores unchanged.
    pub fn update_quantity(
        &mut self,
        barcode: &str,
        op: QuantityOp,
    ) -> Result<QuantityChange, CartError> {
        self.cart.update_quantity(&mut self.catalog, barcode, op)
    }

    /// Remove a line. See [`CartStore::remove_item`].
    ///
    /// # Errors
    ///
    /// Propagates [`CartError`] with both stores unchanged.
    pub fn remove_from_cart(&mut self, barcode: &str) -> Result<Option<CartItem>, CartError> {
        self.cart.remove_item(&mut self.catalog, barcode)
    }

    /// Cart totals.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.cart.totals()
    }

    /// Held quantity plus remaining stock for a barcode.
    ///
    /// Between loads this equals the stock last observed from the catalog
    /// service.
    #[must_use]
    pub fn observed_stock(&self, barcode: &str) -> u64 {
        u64::from(self.catalog.stock_of(barcode).unwrap_or(0))
            + u64::from(self.cart.quantity_of(barcode).unwrap_or(0))
    }

    /// Replace the catalog with a fresh load and reconcile held quantities.
    pub fn load(&mut self, products: Vec<Product>) -> RefreshReport {
        self.catalog.replace(products);

        let held: Vec<Barcode> = self
            .cart
            .items()
            .iter()
            .map(|line| line.barcode.clone())
            .collect();
        let adjustments = held
            .iter()
            .filter_map(|barcode| self.reserve(barcode))
            .collect();

        RefreshReport {
            products: self.catalog.len(),
            policy: self.policy,
            adjustments,
        }
    }

    /// Discard the cart and start over from a fresh load.
    ///
    /// Returns the discarded lines.
    pub fn reset(&mut self, products: Vec<Product>) -> Vec<CartItem> {
        let discarded = self.cart.clear();
        self.catalog.replace(products);
        discarded
    }

    /// Insert or replace one product with a fresh observation from the
    /// catalog service.
    pub fn upsert_product(&mut self, product: Product) -> Option<ReservationAdjustment> {
        let barcode = product.barcode.clone();
        self.catalog.upsert(product);
        self.reserve(&barcode)
    }

    /// Apply an edit acknowledged by the catalog service.
    ///
    /// A stock value in the patch is a fresh observation and is reconciled
    /// against the held quantity like a load.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownProduct`] if the barcode is not loaded.
    pub fn patch_product(
        &mut self,
        barcode: &Barcode,
        patch: &ProductPatch,
    ) -> Result<(Product, Option<ReservationAdjustment>), CatalogError> {
        self.catalog.apply_patch(barcode, patch)?;
        let adjustment = if patch.stock.is_some() {
            self.reserve(barcode)
        } else {
            None
        };
        let product = self
            .catalog
            .find_by_barcode(barcode.as_str())
            .cloned()
            .ok_or_else(|| CatalogError::UnknownProduct(barcode.to_string()))?;
        Ok((product, adjustment))
    }

    /// Remove a product deleted from the catalog service, dropping any cart
    /// line that referenced it.
    pub fn remove_product(&mut self, barcode: &str) -> (Option<Product>, Option<CartItem>) {
        let product = self.catalog.remove(barcode);
        let line = self.cart.forget(barcode);
        (product, line)
    }

    /// Whether the cart's increment control should be enabled for a barcode.
    #[must_use]
    pub fn can_increment(&self, barcode: &str) -> bool {
        self.catalog.stock_of(barcode).is_some_and(|stock| stock > 0)
    }

    /// Reconcile the held quantity of `barcode` with the catalog's current,
    /// freshly observed stock.
    fn reserve(&mut self, barcode: &Barcode) -> Option<ReservationAdjustment> {
        if self.policy == RefreshPolicy::Overwrite {
            return None;
        }

        let held = self.cart.quantity_of(barcode.as_str())?;

        let Some(fresh) = self.catalog.stock_of(barcode.as_str()) else {
            self.cart.forget(barcode.as_str());
            return Some(ReservationAdjustment::Dropped {
                barcode: barcode.clone(),
                held,
            });
        };

        let kept = held.min(fresh);
        // Infallible: the product is loaded
        let _ = self.catalog.set_stock(barcode.as_str(), fresh - kept);

        if kept == held {
            return None;
        }

        self.cart.truncate_line(barcode.as_str(), kept);
        Some(if kept == 0 {
            ReservationAdjustment::Dropped {
                barcode: barcode.clone(),
                held,
            }
        } else {
            ReservationAdjustment::Shrunk {
                barcode: barcode.clone(),
                held,
                kept,
            }
        })
    }
}
