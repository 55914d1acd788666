//! Product catalog commands.
//!
//! # Usage
//!
//! ```bash
//! apotek-cli products list --query vit --sort stock --desc
//! apotek-cli products add -b 8991001 -n "Paracetamol 500mg" -u strip -p "Rp 12.500" -s 40
//! apotek-cli products edit 8991001 --price 13000
//! apotek-cli products delete 8991001
//! ```

use apotek_core::{Barcode, ProductForm, ProductPatchForm, SortKey, SortOrder, search};
use apotek_counter::catalog_api::CatalogClient;

use super::CommandError;

/// List products matching `query`.
pub async fn list(
    client: &CatalogClient,
    query: &str,
    sort: Option<SortKey>,
    desc: bool,
) -> Result<(), CommandError> {
    tracing::info!("Fetching products from {}...", client.base_url());
    let products = client.list_products().await?;

    let mut rows = search::filter(&products, query);
    if let Some(key) = sort {
        let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
        search::sort_products(&mut rows, key, order);
    }

    for product in &rows {
        tracing::info!(
            barcode = %product.barcode,
            name = %product.name,
            unit = %product.unit,
            price = %product.price.display(),
            stock = product.stock,
            "product"
        );
    }
    tracing::info!("{} of {} products shown", rows.len(), products.len());
    Ok(())
}

/// Validate and add a product.
pub async fn add(client: &CatalogClient, form: &ProductForm) -> Result<(), CommandError> {
    let product = form.validate()?;

    tracing::info!("Adding product: {} ({})", product.name, product.barcode);
    let created = client.add_product(&product).await?;

    tracing::info!(
        "Product added successfully! Barcode: {}, Price: {}, Stock: {}",
        created.barcode,
        created.price.display(),
        created.stock
    );
    Ok(())
}

/// Validate and apply an edit.
pub async fn edit(
    client: &CatalogClient,
    barcode: &str,
    form: &ProductPatchForm,
) -> Result<(), CommandError> {
    let barcode = Barcode::parse(barcode)?;
    let patch = form.validate()?;

    tracing::info!("Updating product: {}", barcode);
    match client.edit_product(&barcode, &patch).await? {
        Some(product) => tracing::info!(
            "Product updated successfully! Name: {}, Price: {}, Stock: {}",
            product.name,
            product.price.display(),
            product.stock
        ),
        None => tracing::info!("Product updated successfully!"),
    }
    Ok(())
}

/// Delete a product.
pub async fn delete(client: &CatalogClient, barcode: &str) -> Result<(), CommandError> {
    let barcode = Barcode::parse(barcode)?;

    tracing::info!("Deleting product: {}", barcode);
    let ack = client.delete_product(&barcode).await?;

    tracing::info!(
        "{}",
        ack.message
            .unwrap_or_else(|| format!("Product {barcode} deleted"))
    );
    Ok(())
}
