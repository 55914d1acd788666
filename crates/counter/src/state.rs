//! Application state shared across handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::catalog_api::{CatalogApiError, CatalogClient};
use crate::config::CounterConfig;
use crate::payment::PaymentReconciler;
use crate::scanner::{BarcodeResolver, LineDevice, ScanControl, ScanError};
use crate::session::CatalogSession;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Both surfaces reach the same
/// [`CatalogSession`], so the customer cart and the admin catalog always
/// see one product mirror.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    session: CatalogSession,
    payments: PaymentReconciler,
    scanner: Option<BarcodeResolver<LineDevice>>,
    scan_control: ScanControl,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The catalog starts empty; call [`CatalogSession::refresh`] to load it.
    /// Decode sessions are cancelled when `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog client cannot be built.
    pub fn new(config: &CounterConfig, shutdown: CancellationToken) -> Result<Self, CatalogApiError> {
        let client = CatalogClient::new(config.catalog_api_url.clone(), config.http_timeout)?;
        let session = CatalogSession::new(client, config.refresh_policy);
        let payments = PaymentReconciler::new(session.clone(), config.payment_reload_delay);
        let scanner = config
            .scanner_device
            .as_ref()
            .map(|path| BarcodeResolver::new(LineDevice::new(path), session.clone()));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                session,
                payments,
                scanner,
                scan_control: ScanControl::new(shutdown),
            }),
        })
    }

    /// Get a reference to the shared catalog session.
    #[must_use]
    pub fn session(&self) -> &CatalogSession {
        &self.inner.session
    }

    /// Get a reference to the payment reconciler.
    #[must_use]
    pub fn payments(&self) -> &PaymentReconciler {
        &self.inner.payments
    }

    /// Get the barcode resolver.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotConfigured`] if no scanner device is set.
    pub fn scanner(&self) -> Result<&BarcodeResolver<LineDevice>, ScanError> {
        self.inner.scanner.as_ref().ok_or(ScanError::NotConfigured)
    }

    /// Get a reference to the decode session registry.
    #[must_use]
    pub fn scan_control(&self) -> &ScanControl {
        &self.inner.scan_control
    }
}
