//! Derived search results over the catalog.
//!
//! A query matches a product when it is a case-insensitive substring of the
//! barcode, the name, the plain price digits, or the stock count. A blank
//! query (empty or whitespace only) matches every product, so a cleared
//! search box shows the full catalog.

use std::cmp::Ordering;

use serde::Deserialize;

use crate::catalog::ProductCatalog;
use crate::types::Product;

/// Column a product listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Barcode,
    Name,
    Price,
    Stock,
}

/// Direction of a product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Sort `products` in place by one column.
///
/// The sort is stable, so ties keep catalog order.
pub fn sort_products<P>(products: &mut [P], key: SortKey, order: SortOrder)
where
    P: std::borrow::Borrow<Product>,
{
    products.sort_by(|a, b| {
        let (a, b) = (a.borrow(), b.borrow());
        let ordering = match key {
            SortKey::Barcode => a.barcode.as_str().cmp(b.barcode.as_str()),
            SortKey::Name => compare_names(&a.name, &b.name),
            SortKey::Price => a.price.cmp(&b.price),
            SortKey::Stock => a.stock.cmp(&b.stock),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Returns true if `product` matches an already lowercased, non-blank needle.
fn matches(product: &Product, needle: &str) -> bool {
    product.barcode.as_str().to_lowercase().contains(needle)
        || product.name.to_lowercase().contains(needle)
        || product.price.to_string().contains(needle)
        || product.stock.to_string().contains(needle)
}

/// Filter `products` by `query`, preserving their order.
#[must_use]
pub fn filter<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return products.iter().collect();
    }
    products.iter().filter(|p| matches(p, &needle)).collect()
}

/// One surface's search box: the last query and the results it produced.
///
/// The counter and admin surfaces each own a `SearchFilter`. Results are a
/// snapshot; call [`SearchFilter::recompute`] after every catalog change.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    query: String,
    results: Vec<Product>,
}

impl SearchFilter {
    /// Create a filter with a blank query and no results.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
        }
    }

    /// Set the query and recompute results against `catalog`.
    pub fn set_query(&mut self, catalog: &ProductCatalog, query: &str) -> &[Product] {
        query.clone_into(&mut self.query);
        self.recompute(catalog)
    }

    /// Recompute results for the current query.
    pub fn recompute(&mut self, catalog: &ProductCatalog) -> &[Product] {
        self.results = catalog.search(&self.query).into_iter().cloned().collect();
        &self.results
    }

    /// The last query.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The results of the last recomputation.
    #[must_use]
    pub fn results(&self) -> &[Product] {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;

    fn catalog() -> ProductCatalog {
        ProductCatalog::from_products(vec![
            product("8991001", "Paracetamol 500mg", 12_500, 40),
            product("8991002", "Amoxicillin", 30_000, 0),
            product("QR-VIT-C", "Vitamin C", 7_500, 125),
        ])
    }

    fn barcodes(results: &[&Product]) -> Vec<String> {
        results.iter().map(|p| p.barcode.to_string()).collect()
    }

    #[test]
    fn test_blank_query_returns_everything() {
        let catalog = catalog();
        assert_eq!(catalog.search("").len(), 3);
        assert_eq!(catalog.search("   ").len(), 3);
    }

    #[test]
    fn test_name_match_is_case_insensitive() {
        let catalog = catalog();
        assert_eq!(barcodes(&catalog.search("PARA")), vec!["8991001"]);
        assert_eq!(barcodes(&catalog.search("vitamin")), vec!["QR-VIT-C"]);
    }

    #[test]
    fn test_barcode_match_is_case_insensitive() {
        let catalog = catalog();
        assert_eq!(barcodes(&catalog.search("qr-vit")), vec!["QR-VIT-C"]);
    }

    #[test]
    fn test_price_and_stock_match_on_plain_digits() {
        let catalog = catalog();
        // 12500 (price) and 125 (stock)
        assert_eq!(barcodes(&catalog.search("125")), vec!["8991001", "QR-VIT-C"]);
        // Formatted prices are not searchable
        assert!(catalog.search("12.500").is_empty());
    }

    #[test]
    fn test_results_keep_catalog_order() {
        let catalog = catalog();
        assert_eq!(
            barcodes(&catalog.search("899")),
            vec!["8991001", "8991002"]
        );
    }

    #[test]
    fn test_completeness() {
        let catalog = catalog();
        for query in ["a", "0", "c", "mg", "99", "x"] {
            let results = catalog.search(query);
            let needle = query.to_lowercase();
            for product in &catalog {
                let hit = matches(product, &needle);
                let returned = results.iter().any(|p| p.barcode == product.barcode);
                assert_eq!(hit, returned, "query {query:?} product {}", product.barcode);
            }
        }
    }

    #[test]
    fn test_sort_products() {
        let catalog = catalog();
        let mut results = catalog.search("");

        sort_products(&mut results, SortKey::Price, SortOrder::Asc);
        assert_eq!(barcodes(&results), vec!["QR-VIT-C", "8991001", "8991002"]);

        sort_products(&mut results, SortKey::Stock, SortOrder::Desc);
        assert_eq!(barcodes(&results), vec!["QR-VIT-C", "8991001", "8991002"]);

        sort_products(&mut results, SortKey::Name, SortOrder::Asc);
        assert_eq!(barcodes(&results), vec!["8991002", "8991001", "QR-VIT-C"]);
    }

    #[test]
    fn test_filter_tracks_catalog_changes() {
        let mut catalog = catalog();
        let mut filter = SearchFilter::new();
        assert_eq!(filter.set_query(&catalog, "vit").len(), 1);

        catalog.remove("QR-VIT-C");
        assert_eq!(filter.results().len(), 1, "snapshot until recomputed");
        assert!(filter.recompute(&catalog).is_empty());
        assert_eq!(filter.query(), "vit");
    }

    #[test]
    fn test_independent_filters() {
        let catalog = catalog();
        let mut counter = SearchFilter::new();
        let mut admin = SearchFilter::new();
        counter.set_query(&catalog, "amox");
        admin.set_query(&catalog, "");
        assert_eq!(counter.results().len(), 1);
        assert_eq!(admin.results().len(), 3);
    }
}
