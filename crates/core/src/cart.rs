//! Cart lines paired with catalog stock.
//!
//! Every cart mutation moves units between the catalog and the cart, so for
//! each held barcode `catalog stock + cart quantity` is unchanged by any
//! operation here. Methods take the catalog by `&mut` so both sides change
//! under one borrow; nothing can observe one side updated without the other.
//!
//! Per barcode a line moves through `Absent -> Present(1) -> Present(n) ->
//! Absent`.

use crate::catalog::{CatalogError, ProductCatalog};
use crate::types::{CartItem, CartTotals, Price, QuantityOp};

/// Errors from cart operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// The barcode does not reference a loaded product.
    #[error("no product found for barcode {0}")]
    NotFound(String),

    /// The product has no stock left to add.
    #[error("{name} is out of stock")]
    StockExhausted {
        /// Product barcode.
        barcode: String,
        /// Product name, for the notification.
        name: String,
    },

    /// The barcode has no line in the cart.
    #[error("{0} is not in the cart")]
    NotInCart(String),

    /// A paired catalog adjustment was refused.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Outcome of [`CartStore::update_quantity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuantityChange {
    /// Quantity went up; holds the new quantity.
    Incremented(u32),
    /// Quantity went down; holds the new quantity.
    Decremented(u32),
    /// The line was at quantity 1 and has been removed.
    Removed(CartItem),
    /// Increment requested with no catalog stock left.
    Unchanged,
}

/// Selected lines, in the order they were first added.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    items: Vec<CartItem>,
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn position(&self, barcode: &str) -> Option<usize> {
        self.items.iter().position(|i| i.barcode == barcode)
    }

    fn line_mut(&mut self, barcode: &str) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|i| i.barcode == barcode)
    }

    /// Add one unit of a product, taking it from catalog stock.
    ///
    /// Creates a line with quantity 1 or bumps an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] for an unknown barcode and
    /// [`CartError::StockExhausted`] when the product has no stock. Neither
    /// the cart nor the catalog changes on error.
    pub fn add_item(
        &mut self,
        catalog: &mut ProductCatalog,
        barcode: &str,
    ) -> Result<&CartItem, CartError> {
        let product = catalog
            .find_by_barcode(barcode)
            .ok_or_else(|| CartError::NotFound(barcode.to_owned()))?;

        if product.stock == 0 {
            return Err(CartError::StockExhausted {
                barcode: barcode.to_owned(),
                name: product.name.clone(),
            });
        }

        let fresh_line = CartItem::first_unit(product);
        catalog.adjust_stock(barcode, -1)?;

        let index = match self.position(barcode) {
            Some(index) => {
                if let Some(line) = self.items.get_mut(index) {
                    line.quantity += 1;
                }
                index
            }
            None => {
                self.items.push(fresh_line);
                self.items.len() - 1
            }
        };

        self.items
            .get(index)
            .ok_or_else(|| CartError::NotInCart(barcode.to_owned()))
    }

    /// Step a line's quantity up or down.
    ///
    /// - `Increment` takes one unit from the catalog, or does nothing when
    ///   the catalog has none left.
    /// - `Decrement` returns one unit to the catalog; at quantity 1 it removes
    ///   the line (see [`CartStore::remove_item`]). A line whose product is
    ///   no longer loaded still steps down.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotInCart`] if the barcode has no line, or
    /// [`CartError::NotFound`] when incrementing a product that is no longer
    /// loaded.
    pub fn update_quantity(
        &mut self,
        catalog: &mut ProductCatalog,
        barcode: &str,
        op: QuantityOp,
    ) -> Result<QuantityChange, CartError> {
        let quantity = self
            .quantity_of(barcode)
            .ok_or_else(|| CartError::NotInCart(barcode.to_owned()))?;

        match op {
            QuantityOp::Increment => {
                let stock = catalog
                    .stock_of(barcode)
                    .ok_or_else(|| CartError::NotFound(barcode.to_owned()))?;
                if stock == 0 {
                    return Ok(QuantityChange::Unchanged);
                }
                catalog.adjust_stock(barcode, -1)?;
                let line = self
                    .line_mut(barcode)
                    .ok_or_else(|| CartError::NotInCart(barcode.to_owned()))?;
                line.quantity += 1;
                Ok(QuantityChange::Incremented(line.quantity))
            }
            QuantityOp::Decrement if quantity > 1 => {
                if catalog.contains(barcode) {
                    catalog.adjust_stock(barcode, 1)?;
                }
                let line = self
                    .line_mut(barcode)
                    .ok_or_else(|| CartError::NotInCart(barcode.to_owned()))?;
                line.quantity -= 1;
                Ok(QuantityChange::Decremented(line.quantity))
            }
            QuantityOp::Decrement => self
                .remove_item(catalog, barcode)?
                .map(QuantityChange::Removed)
                .ok_or_else(|| CartError::NotInCart(barcode.to_owned())),
        }
    }

    /// Remove a line, returning its whole quantity to catalog stock.
    ///
    /// Returns `Ok(None)` if the barcode has no line. A line whose product is
    /// no longer loaded is still removed; there is no stock to return it to.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Catalog`] if returning the quantity would
    /// overflow the product's stock; the line is kept in that case.
    pub fn remove_item(
        &mut self,
        catalog: &mut ProductCatalog,
        barcode: &str,
    ) -> Result<Option<CartItem>, CartError> {
        let Some(index) = self.position(barcode) else {
            return Ok(None);
        };

        let quantity = self.items.get(index).map_or(0, |line| line.quantity);
        if catalog.contains(barcode) {
            catalog.adjust_stock(barcode, i64::from(quantity))?;
        }

        Ok(Some(self.items.remove(index)))
    }

    /// Totals over the current lines.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.items.iter().fold(CartTotals::default(), |acc, line| CartTotals {
            total_items: acc.total_items + u64::from(line.quantity),
            total_price: acc.total_price.saturating_add(line.subtotal()),
        })
    }

    /// Held quantity for a barcode, if it has a line.
    #[must_use]
    pub fn quantity_of(&self, barcode: &str) -> Option<u32> {
        self.get(barcode).map(|line| line.quantity)
    }

    /// The line for a barcode.
    #[must_use]
    pub fn get(&self, barcode: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.barcode == barcode)
    }

    /// All lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Returns true if the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Drop every line without touching the catalog.
    ///
    /// Only valid when the catalog is about to be replaced wholesale, as on a
    /// session discard.
    pub fn clear(&mut self) -> Vec<CartItem> {
        std::mem::take(&mut self.items)
    }

    /// Shrink a line to `quantity` without touching the catalog, removing it
    /// at zero. Used when reconciling against freshly loaded stock.
    pub(crate) fn truncate_line(&mut self, barcode: &str, quantity: u32) -> Option<CartItem> {
        let index = self.position(barcode)?;
        if quantity == 0 {
            return Some(self.items.remove(index));
        }
        if let Some(line) = self.items.get_mut(index) {
            line.quantity = line.quantity.min(quantity);
        }
        None
    }

    /// Drop a line without touching the catalog.
    pub(crate) fn forget(&mut self, barcode: &str) -> Option<CartItem> {
        let index = self.position(barcode)?;
        Some(self.items.remove(index))
    }

    /// Total value of the cart.
    #[must_use]
    pub fn total_price(&self) -> Price {
        self.totals().total_price
    }
}
