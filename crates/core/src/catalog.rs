//! Local mirror of the remote product catalog.
//!
//! The catalog keeps products in the order the service returned them, which is
//! the order every listing and search result uses.

use crate::search;
use crate::types::{Barcode, Product, ProductPatch};

/// Errors from in-memory catalog mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No product with this barcode is loaded.
    #[error("unknown product: {0}")]
    UnknownProduct(String),

    /// The adjustment would leave stock below zero or above `u32::MAX`.
    #[error("stock adjustment {delta} out of range for {barcode} (stock {stock})")]
    StockOutOfRange {
        /// Product barcode.
        barcode: String,
        /// Stock before the adjustment.
        stock: u32,
        /// Requested delta.
        delta: i64,
    },
}

/// The authoritative local mirror of catalog products.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Create a catalog from a product list.
    #[must_use]
    pub fn from_products(products: Vec<Product>) -> Self {
        let mut catalog = Self::new();
        catalog.replace(products);
        catalog
    }

    /// Replace every product at once.
    ///
    /// Later duplicates of a barcode win, keeping the position of the first.
    pub fn replace(&mut self, products: Vec<Product>) {
        let mut deduped: Vec<Product> = Vec::with_capacity(products.len());
        for product in products {
            match deduped.iter_mut().find(|p| p.barcode == product.barcode) {
                Some(existing) => *existing = product,
                None => deduped.push(product),
            }
        }
        self.products = deduped;
    }

    /// Exact-match lookup. Absence is a normal outcome.
    #[must_use]
    pub fn find_by_barcode(&self, barcode: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.barcode == barcode)
    }

    fn find_mut(&mut self, barcode: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.barcode == barcode)
    }

    /// Current stock of a product.
    #[must_use]
    pub fn stock_of(&self, barcode: &str) -> Option<u32> {
        self.find_by_barcode(barcode).map(|p| p.stock)
    }

    /// Returns true if a product with this barcode is loaded.
    #[must_use]
    pub fn contains(&self, barcode: &str) -> bool {
        self.find_by_barcode(barcode).is_some()
    }

    /// Apply a signed delta to a product's stock and return the new stock.
    ///
    /// Keeping the result in range is the caller's job; the catalog never
    /// clamps. A delta that would leave stock negative cannot be represented
    /// and is refused without touching the product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownProduct`] if the barcode is not loaded,
    /// or [`CatalogError::StockOutOfRange`] if the result leaves `u32`.
    pub fn adjust_stock(&mut self, barcode: &str, delta: i64) -> Result<u32, CatalogError> {
        let product = self
            .find_mut(barcode)
            .ok_or_else(|| CatalogError::UnknownProduct(barcode.to_owned()))?;

        let adjusted = i64::from(product.stock)
            .checked_add(delta)
            .and_then(|s| u32::try_from(s).ok())
            .ok_or_else(|| CatalogError::StockOutOfRange {
                barcode: barcode.to_owned(),
                stock: product.stock,
                delta,
            })?;

        product.stock = adjusted;
        Ok(adjusted)
    }

    /// Overwrite a product's stock with a fresh observation.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownProduct`] if the barcode is not loaded.
    pub fn set_stock(&mut self, barcode: &str, stock: u32) -> Result<(), CatalogError> {
        let product = self
            .find_mut(barcode)
            .ok_or_else(|| CatalogError::UnknownProduct(barcode.to_owned()))?;
        product.stock = stock;
        Ok(())
    }

    /// Insert a product, replacing any product with the same barcode in place.
    pub fn upsert(&mut self, product: Product) {
        match self.find_mut(product.barcode.as_str()) {
            Some(existing) => *existing = product,
            None => self.products.push(product),
        }
    }

    /// Apply a patch to a loaded product.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownProduct`] if the barcode is not loaded.
    pub fn apply_patch(
        &mut self,
        barcode: &Barcode,
        patch: &ProductPatch,
    ) -> Result<&Product, CatalogError> {
        let product = self
            .find_mut(barcode.as_str())
            .ok_or_else(|| CatalogError::UnknownProduct(barcode.to_string()))?;
        product.apply(patch);
        Ok(product)
    }

    /// Remove a product, returning it if it was loaded.
    pub fn remove(&mut self, barcode: &str) -> Option<Product> {
        let index = self.products.iter().position(|p| p.barcode == barcode)?;
        Some(self.products.remove(index))
    }

    /// Products whose barcode, name, price or stock contain `query`.
    ///
    /// See [`search::filter`] for the matching rules.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&Product> {
        search::filter(&self.products, query)
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Iterate over products in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, Product> {
        self.products.iter()
    }

    /// Number of loaded products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if no products are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl<'a> IntoIterator for &'a ProductCatalog {
    type Item = &'a Product;
    type IntoIter = std::slice::Iter<'a, Product>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Price;

    pub(crate) fn product(barcode: &str, name: &str, price: u64, stock: u32) -> Product {
        Product {
            barcode: Barcode::parse(barcode).unwrap(),
            name: name.to_owned(),
            unit: "u".to_owned(),
            price: Price::new(price),
            stock,
        }
    }

    #[test]
    fn test_find_by_barcode() {
        let catalog = ProductCatalog::from_products(vec![product("A", "X", 10, 2)]);
        assert_eq!(catalog.find_by_barcode("A").unwrap().name, "X");
        assert!(catalog.find_by_barcode("a").is_none());
        assert!(catalog.find_by_barcode("").is_none());
    }

    #[test]
    fn test_replace_is_total() {
        let mut catalog =
            ProductCatalog::from_products(vec![product("A", "X", 10, 2), product("B", "Y", 5, 1)]);
        catalog.replace(vec![product("C", "Z", 1, 1)]);
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.contains("A"));
        assert!(catalog.contains("C"));
    }

    #[test]
    fn test_replace_dedupes_by_barcode() {
        let catalog = ProductCatalog::from_products(vec![
            product("A", "old", 10, 2),
            product("B", "Y", 5, 1),
            product("A", "new", 11, 3),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.products()[0].name, "new");
        assert_eq!(catalog.products()[1].barcode, "B");
    }

    #[test]
    fn test_adjust_stock() {
        let mut catalog = ProductCatalog::from_products(vec![product("A", "X", 10, 2)]);
        assert_eq!(catalog.adjust_stock("A", -2), Ok(0));
        assert_eq!(catalog.adjust_stock("A", 5), Ok(5));
        assert_eq!(catalog.stock_of("A"), Some(5));
    }

    #[test]
    fn test_adjust_stock_below_zero_is_refused() {
        let mut catalog = ProductCatalog::from_products(vec![product("A", "X", 10, 1)]);
        let err = catalog.adjust_stock("A", -2).unwrap_err();
        assert_eq!(
            err,
            CatalogError::StockOutOfRange {
                barcode: "A".to_owned(),
                stock: 1,
                delta: -2
            }
        );
        assert_eq!(catalog.stock_of("A"), Some(1));
    }

    #[test]
    fn test_adjust_stock_unknown() {
        let mut catalog = ProductCatalog::new();
        assert!(matches!(
            catalog.adjust_stock("A", 1),
            Err(CatalogError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut catalog = ProductCatalog::from_products(vec![product("A", "X", 10, 2)]);
        catalog.upsert(product("B", "Y", 5, 1));
        catalog.upsert(product("A", "X2", 12, 4));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.products()[0].name, "X2");

        let removed = catalog.remove("A").unwrap();
        assert_eq!(removed.name, "X2");
        assert!(catalog.remove("A").is_none());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_apply_patch() {
        let mut catalog = ProductCatalog::from_products(vec![product("A", "X", 10, 2)]);
        let patch = ProductPatch {
            price: Some(Price::new(20)),
            ..ProductPatch::default()
        };
        let barcode = Barcode::parse("A").unwrap();
        assert_eq!(catalog.apply_patch(&barcode, &patch).unwrap().price, Price::new(20));

        let missing = Barcode::parse("Z").unwrap();
        assert!(catalog.apply_patch(&missing, &patch).is_err());
    }
}
