//! Payment command.

use apotek_core::Barcode;
use apotek_counter::catalog_api::{CatalogApiError, CatalogClient};

use super::CommandError;

/// Submit one payment for `quantity` units of `barcode`.
pub async fn pay(client: &CatalogClient, barcode: &str, quantity: u32) -> Result<(), CommandError> {
    let barcode = Barcode::parse(barcode)?;

    tracing::info!("Paying for {} x {}...", quantity, barcode);
    match client.pay(&barcode, quantity).await {
        Ok(ack) => {
            tracing::info!(
                "Payment succeeded: {}",
                ack.message.as_deref().unwrap_or("no message")
            );
            Ok(())
        }
        Err(e @ CatalogApiError::Status { .. }) => {
            tracing::warn!(
                "Payment rejected: {}",
                e.server_message().unwrap_or("no message from the service")
            );
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
