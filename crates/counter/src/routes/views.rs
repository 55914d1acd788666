//! JSON views returned by the counter and admin surfaces.

use apotek_core::{CartItem, Inventory, Product, SortKey, SortOrder, sort_products};
use serde::{Deserialize, Serialize};

use crate::notify::Notification;
use crate::session::Store;

/// A product row with display helpers.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub price_display: String,
    /// Whether the "select" control is enabled.
    pub in_stock: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            price_display: product.price.display(),
            in_stock: product.stock > 0,
            product,
        }
    }
}

/// One cart line with its control state.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    #[serde(flatten)]
    pub item: CartItem,
    pub price_display: String,
    pub subtotal_display: String,
    /// Catalog stock still available for this product.
    pub stock_remaining: u32,
    /// Increment is enabled only while catalog stock remains.
    pub can_increment: bool,
    /// Decrement is always enabled; at quantity 1 it removes the line.
    pub can_decrement: bool,
}

/// The cart as shown in the drawer.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total_items: u64,
    pub total_price: u64,
    pub total_price_display: String,
    /// Set while the catalog could not be loaded; stock shown may be stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_notice: Option<Notification>,
}

impl CartView {
    /// Build the view from the store under the session lock.
    #[must_use]
    pub fn from_store(store: &Store) -> Self {
        let mut view = Self::from_inventory(&store.inventory);
        view.catalog_notice = store.load_error.as_ref().map(|err| {
            Notification::error(
                "Catalog unavailable",
                format!("Could not load the catalog: {err}"),
            )
        });
        view
    }

    /// Build the view from the inventory alone.
    #[must_use]
    pub fn from_inventory(inventory: &Inventory) -> Self {
        let items = inventory
            .cart()
            .items()
            .iter()
            .map(|item| CartLineView {
                price_display: item.price.display(),
                subtotal_display: item.subtotal().display(),
                stock_remaining: inventory
                    .catalog()
                    .stock_of(item.barcode.as_str())
                    .unwrap_or(0),
                can_increment: inventory.can_increment(item.barcode.as_str()),
                can_decrement: true,
                item: item.clone(),
            })
            .collect();
        let totals = inventory.totals();

        Self {
            items,
            total_items: totals.total_items,
            total_price: totals.total_price.amount(),
            total_price_display: totals.total_price.display(),
            catalog_notice: None,
        }
    }
}

/// A cart mutation result.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
    pub cart: CartView,
}

/// Request body naming one barcode.
#[derive(Debug, Clone, Deserialize)]
pub struct BarcodeRequest {
    pub barcode: String,
}

/// Query string for product listings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub q: String,
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub order: SortOrder,
}

impl ProductQuery {
    /// Apply the requested ordering and build the rows.
    #[must_use]
    pub fn rows(&self, mut products: Vec<Product>) -> Vec<ProductView> {
        if let Some(key) = self.sort {
            sort_products(&mut products, key, self.order);
        }
        products.into_iter().map(ProductView::from).collect()
    }
}
