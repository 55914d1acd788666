//! CLI subcommands.

pub mod pay;
pub mod products;

use std::time::Duration;

use apotek_core::{BarcodeError, ValidationError};
use apotek_counter::catalog_api::{CatalogApiError, CatalogClient};
use thiserror::Error;
use url::Url;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Input rejected locally; nothing was sent.
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Malformed barcode argument.
    #[error("Invalid barcode: {0}")]
    Barcode(#[from] BarcodeError),

    /// The catalog service call failed.
    #[error("{0}")]
    Api(#[from] CatalogApiError),
}

/// Build the catalog client.
///
/// # Errors
///
/// Returns an error if the base URL is unusable or the HTTP client fails to
/// build.
pub fn client(base_url: Url, timeout: Duration) -> Result<CatalogClient, CommandError> {
    Ok(CatalogClient::new(base_url, timeout)?)
}
