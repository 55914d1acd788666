//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding. Every error reaches the client as a JSON
//! [`Notification`] so the counter screen can show it directly.

use apotek_core::{CartError, CatalogError, ValidationError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::catalog_api::CatalogApiError;
use crate::notify::Notification;
use crate::payment::PaymentError;
use crate::scanner::ScanError;
use crate::session::SessionError;

/// Application-level error type for the counter.
#[derive(Debug, Error)]
pub enum AppError {
    /// The catalog service could not be reached or answered with an error.
    #[error("Fetch error: {0}")]
    Fetch(#[from] CatalogApiError),

    /// Admin input was rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A cart operation was refused.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// The catalog mirror refused a change.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A payment failed or could not start.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// A decode session failed.
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(e) => Self::Validation(e),
            SessionError::Api(e) => Self::Fetch(e),
            SessionError::Catalog(e) => Self::Catalog(e),
        }
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Fetch(CatalogApiError::Status { status: 404, .. }) => StatusCode::NOT_FOUND,
            // The service refused the change itself (duplicate barcode, etc.)
            Self::Fetch(CatalogApiError::Status { status, .. }) if (400..500).contains(status) => {
                StatusCode::CONFLICT
            }
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Cart(err) => match err {
                CartError::NotFound(_) | CartError::NotInCart(_) => StatusCode::NOT_FOUND,
                CartError::StockExhausted { .. } => StatusCode::CONFLICT,
                CartError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(err) => match err {
                CatalogError::UnknownProduct(_) => StatusCode::NOT_FOUND,
                CatalogError::StockOutOfRange { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Payment(err) => match err {
                PaymentError::InvalidBarcode(_) => StatusCode::BAD_REQUEST,
                PaymentError::NotInCart(_) => StatusCode::NOT_FOUND,
                PaymentError::InFlight | PaymentError::AwaitingReload => StatusCode::CONFLICT,
                PaymentError::Rejected { status, .. } if *status < 500 => StatusCode::CONFLICT,
                PaymentError::Rejected { .. } | PaymentError::Transport(_) => {
                    StatusCode::BAD_GATEWAY
                }
            },
            Self::Scan(err) => match err {
                ScanError::NotConfigured | ScanError::Unavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ScanError::Busy | ScanError::Cancelled => StatusCode::CONFLICT,
                ScanError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ScanError::Device(_) | ScanError::Closed => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// The notification shown for this error.
    #[must_use]
    pub fn notification(&self) -> Notification {
        match self {
            Self::Fetch(CatalogApiError::Status { status, message }) if *status < 500 => {
                Notification::error(
                    "Request refused",
                    message.clone().unwrap_or_else(|| {
                        format!("The catalog service refused the request (HTTP {status})")
                    }),
                )
            }
            Self::Fetch(err) => Notification::error(
                "Catalog unavailable",
                err.server_message()
                    .map_or_else(|| "Could not reach the catalog service".to_owned(), str::to_owned),
            ),
            Self::Validation(err) => Notification::error("Input error", err.to_string()),
            Self::Cart(CartError::StockExhausted { name, .. }) => {
                Notification::warning("Out of stock", format!("{name} has no stock left"))
            }
            Self::Cart(CartError::NotFound(barcode)) => {
                Notification::warning("Product not found", format!("No product for {barcode}"))
            }
            Self::Payment(err @ PaymentError::Rejected { .. }) => {
                Notification::error("Payment failed", err.to_string())
            }
            Self::Payment(PaymentError::Transport(_)) => Notification::error(
                "Payment failed",
                "Could not reach the payment service",
            ),
            Self::Payment(err) => Notification::warning("Payment", err.to_string()),
            Self::Scan(err) => Notification::warning("Scanner", err.to_string()),
            Self::Cart(CartError::Catalog(_)) | Self::Catalog(CatalogError::StockOutOfRange { .. }) => {
                Notification::error("Error", "Internal server error")
            }
            Self::Cart(err) => Notification::warning("Cart", err.to_string()),
            Self::Catalog(err) => Notification::warning("Catalog", err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, Json(self.notification())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Level;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Cart(CartError::NotFound("8991001".to_string()));
        assert_eq!(err.to_string(), "Cart error: no product found for barcode 8991001");

        let err = AppError::Validation(ValidationError::EmptyPatch);
        assert_eq!(err.to_string(), "Validation error: nothing to update");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::Cart(CartError::StockExhausted {
                barcode: "A".to_string(),
                name: "X".to_string(),
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::NotFound("A".to_string()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Validation(ValidationError::EmptyPatch)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Payment(PaymentError::InFlight)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Payment(PaymentError::AwaitingReload)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Payment(PaymentError::Rejected {
                status: 500,
                message: "down".to_string(),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Scan(ScanError::NotConfigured)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AppError::Fetch(CatalogApiError::Parse("eof".to_string()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Fetch(CatalogApiError::Status {
                status: 409,
                message: None,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Fetch(CatalogApiError::Status {
                status: 404,
                message: None,
            })),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_notifications() {
        let stock = AppError::Cart(CartError::StockExhausted {
            barcode: "A".to_string(),
            name: "Paracetamol".to_string(),
        })
        .notification();
        assert_eq!(stock.level, Level::Warning);
        assert_eq!(stock.title, "Out of stock");

        let paid = AppError::Payment(PaymentError::Rejected {
            status: 400,
            message: "Stok tidak cukup".to_string(),
        })
        .notification();
        assert_eq!(paid.level, Level::Error);
        assert_eq!(paid.description, "Stok tidak cukup");

        // Internal details stay out of the response
        let internal = AppError::Catalog(CatalogError::StockOutOfRange {
            barcode: "A".to_string(),
            stock: 0,
            delta: -1,
        })
        .notification();
        assert_eq!(internal.description, "Internal server error");
    }
}
