//! HTTP client for the remote catalog service.
//!
//! The service speaks plain JSON over REST with no auth headers and no
//! pagination envelope:
//!
//! ```text
//! GET    /api/products                  -> [Product]
//! POST   /api/addProduct                -> created Product
//! PUT    /api/editProduct/{barcode}     -> updated Product
//! DELETE /api/deleteProduct/{barcode}   -> confirmation
//! POST   /api/pay {barcode, quantity}   -> {message}
//! ```
//!
//! Error bodies may carry `{message}`; they may also be empty or not JSON at
//! all, so messages are always optional.

use std::sync::Arc;
use std::time::Duration;

use apotek_core::{Barcode, Product, ProductPatch};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Errors that can occur when talking to the catalog service.
#[derive(Debug, Error)]
pub enum CatalogApiError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error(
        "catalog service returned HTTP {status}: {}",
        .message.as_deref().unwrap_or("no message")
    )]
    Status {
        status: u16,
        message: Option<String>,
    },

    /// A success response had a body we could not read.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The configured base URL cannot carry an API path.
    #[error("invalid catalog base URL: {0}")]
    InvalidBaseUrl(String),
}

impl CatalogApiError {
    /// The server-provided message, if the error carried one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// A confirmation from the catalog service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// Human-readable confirmation, if the service sent one.
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct MessageBody {
    message: Option<String>,
}

/// Pull a message out of a response body.
///
/// Accepts `{"message": "..."}`; falls back to short plain-text bodies and
/// ignores anything else.
fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<MessageBody>(body) {
        return parsed.message.filter(|m| !m.trim().is_empty());
    }
    let looks_like_markup = body.starts_with('<') || body.starts_with('{') || body.starts_with('[');
    if looks_like_markup || body.len() > 200 {
        return None;
    }
    Some(body.to_owned())
}

/// Client for the catalog service.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Create a new client rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path or the HTTP
    /// client fails to build.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, CatalogApiError> {
        if base_url.cannot_be_a_base() {
            return Err(CatalogApiError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(CatalogClientInner { client, base_url }),
        })
    }

    /// The service base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build an endpoint URL, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, CatalogApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| CatalogApiError::InvalidBaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turn a non-success response into [`CatalogApiError::Status`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CatalogApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // A body that fails to read is treated like a missing one
        let body = response.text().await.unwrap_or_default();
        let message = extract_message(&body);
        warn!(status = status.as_u16(), message = ?message, "catalog service error");

        Err(CatalogApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Fetch every product.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status or an
    /// unreadable body.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, CatalogApiError> {
        let url = self.endpoint(&["api", "products"])?;
        let response = Self::check(self.inner.client.get(url).send().await?).await?;

        let body = response.text().await?;
        let products: Vec<Product> =
            serde_json::from_str(&body).map_err(|e| CatalogApiError::Parse(e.to_string()))?;

        debug!(count = products.len(), "fetched products");
        Ok(products)
    }

    /// Create a product.
    ///
    /// Returns the product echoed by the service, or the submitted product if
    /// the service answered with something else (such as a bare
    /// confirmation).
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    #[instrument(skip(self, product), fields(barcode = %product.barcode))]
    pub async fn add_product(&self, product: &Product) -> Result<Product, CatalogApiError> {
        let url = self.endpoint(&["api", "addProduct"])?;
        let response =
            Self::check(self.inner.client.post(url).json(product).send().await?).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| {
            debug!("add response was not a product, keeping submitted values");
            product.clone()
        }))
    }

    /// Update the fields carried by `patch`.
    ///
    /// Returns the updated product if the service echoed one.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    #[instrument(skip(self, patch), fields(barcode = %barcode))]
    pub async fn edit_product(
        &self,
        barcode: &Barcode,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, CatalogApiError> {
        let url = self.endpoint(&["api", "editProduct", barcode.as_str()])?;
        let response = Self::check(self.inner.client.put(url).json(patch).send().await?).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body).ok())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    #[instrument(skip(self), fields(barcode = %barcode))]
    pub async fn delete_product(&self, barcode: &Barcode) -> Result<Ack, CatalogApiError> {
        let url = self.endpoint(&["api", "deleteProduct", barcode.as_str()])?;
        let response = Self::check(self.inner.client.delete(url).send().await?).await?;

        let body = response.text().await?;
        Ok(Ack {
            message: extract_message(&body),
        })
    }

    /// Submit one payment for exactly `quantity` units of `barcode`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or non-success status.
    #[instrument(skip(self), fields(barcode = %barcode))]
    pub async fn pay(&self, barcode: &Barcode, quantity: u32) -> Result<Ack, CatalogApiError> {
        let url = self.endpoint(&["api", "pay"])?;
        let body = serde_json::json!({
            "barcode": barcode,
            "quantity": quantity,
        });
        let response = Self::check(self.inner.client.post(url).json(&body).send().await?).await?;

        let body = response.text().await?;
        Ok(Ack {
            message: extract_message(&body),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> CatalogClient {
        CatalogClient::new(Url::parse(base).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let client = client("http://localhost:5000");
        assert_eq!(
            client.endpoint(&["api", "products"]).unwrap().as_str(),
            "http://localhost:5000/api/products"
        );

        let client = self::client("https://example.com/pharmacy/");
        assert_eq!(
            client.endpoint(&["api", "pay"]).unwrap().as_str(),
            "https://example.com/pharmacy/api/pay"
        );
    }

    #[test]
    fn test_endpoint_encodes_barcode() {
        let client = client("http://localhost:5000");
        let url = client
            .endpoint(&["api", "editProduct", "QR 12/34?x"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/editProduct/QR%2012%2F34%3Fx"
        );
    }

    #[test]
    fn test_rejects_opaque_base_url() {
        let result = CatalogClient::new(
            Url::parse("mailto:ops@example.com").unwrap(),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(CatalogApiError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_extract_message() {
        assert_eq!(
            extract_message(r#"{"message":"Stok tidak cukup"}"#).as_deref(),
            Some("Stok tidak cukup")
        );
        assert_eq!(extract_message("Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(extract_message(""), None);
        assert_eq!(extract_message(r#"{"error":"x"}"#), None);
        assert_eq!(extract_message(r#"{"message":"  "}"#), None);
        assert_eq!(extract_message("<html><body>502</body></html>"), None);
    }

    #[test]
    fn test_status_error_display() {
        let err = CatalogApiError::Status {
            status: 409,
            message: Some("duplicate barcode".to_owned()),
        };
        assert_eq!(
            err.to_string(),
            "catalog service returned HTTP 409: duplicate barcode"
        );
        assert_eq!(err.server_message(), Some("duplicate barcode"));

        let err = CatalogApiError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "catalog service returned HTTP 500: no message");
    }
}
