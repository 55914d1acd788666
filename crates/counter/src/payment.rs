//! Payment submission and post-payment session reset.
//!
//! A payment pays for exactly one cart line: the barcode and the quantity
//! held for it. The status of the latest submission is published on a
//! `watch` channel and always moves `Idle -> Pending -> Succeeded | Failed`,
//! including when the submitting request is dropped mid-flight. A successful
//! payment schedules a full session discard after a short delay, and no new
//! payment is accepted until that discard has run.

use std::time::Duration;

use apotek_core::{Barcode, BarcodeError, PaymentStatus};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::catalog_api::CatalogApiError;
use crate::session::CatalogSession;

/// Shown when the service accepts a payment without a message.
const DEFAULT_SUCCESS_MESSAGE: &str = "Payment received";

/// Errors from payment submission.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The barcode is malformed.
    #[error("invalid barcode: {0}")]
    InvalidBarcode(#[from] BarcodeError),

    /// There is no cart line to pay for.
    #[error("{0} is not in the cart")]
    NotInCart(String),

    /// Another payment is still pending.
    #[error("a payment is already in progress")]
    InFlight,

    /// A payment succeeded and the session has not been reloaded yet.
    #[error("the last payment is still being applied; wait for the catalog to reload")]
    AwaitingReload,

    /// The service refused the payment.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The service could not be reached.
    #[error("payment could not be submitted: {0}")]
    Transport(CatalogApiError),
}

impl PaymentError {
    /// Build the error for a failed service call.
    ///
    /// A rejection without a usable body still gets a readable message.
    fn from_api(err: CatalogApiError) -> Self {
        match err {
            CatalogApiError::Status { status, message } => Self::Rejected {
                status,
                message: message.unwrap_or_else(|| format!("Payment failed (HTTP {status})")),
            },
            other => Self::Transport(other),
        }
    }
}

/// Moves a pending status to `Failed` unless the submission settled.
struct PendingGuard<'a> {
    status: &'a watch::Sender<PaymentStatus>,
    barcode: Barcode,
    armed: bool,
}

impl PendingGuard<'_> {
    fn settle(mut self, status: PaymentStatus) {
        self.armed = false;
        self.status.send_replace(status);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(barcode = %self.barcode, "payment submission interrupted");
            self.status.send_replace(PaymentStatus::Failed {
                barcode: self.barcode.clone(),
                message: "Payment was interrupted before the service answered".to_owned(),
            });
        }
    }
}

/// Submits payments and resets the session after success.
pub struct PaymentReconciler {
    session: CatalogSession,
    status: watch::Sender<PaymentStatus>,
    reload_delay: Duration,
    pending_reload: Mutex<Option<JoinHandle<()>>>,
}

impl PaymentReconciler {
    #[must_use]
    pub fn new(session: CatalogSession, reload_delay: Duration) -> Self {
        let (status, _) = watch::channel(PaymentStatus::Idle);
        Self {
            session,
            status,
            reload_delay,
            pending_reload: Mutex::new(None),
        }
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> PaymentStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PaymentStatus> {
        self.status.subscribe()
    }

    /// Pay for the cart line held for `barcode`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::NotInCart`] if no line is held, otherwise as
    /// [`PaymentReconciler::pay`].
    pub async fn pay_cart_line(&self, barcode: &str) -> Result<String, PaymentError> {
        let barcode = Barcode::parse(barcode)?;
        let quantity = self
            .session
            .read()
            .await
            .inventory
            .cart()
            .quantity_of(barcode.as_str())
            .ok_or_else(|| PaymentError::NotInCart(barcode.to_string()))?;

        self.pay(barcode, quantity).await
    }

    /// Submit exactly one `(barcode, quantity)` payment.
    ///
    /// Returns the success message. Cart and catalog are never touched here:
    /// on success the whole session is discarded after the reload delay, on
    /// failure both are left as they were.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::InFlight`] if a payment is pending,
    /// [`PaymentError::AwaitingReload`] if a paid session has not been
    /// discarded yet, or the rejection or transport error. Only rejection
    /// and transport errors are published as a `Failed` status.
    #[instrument(skip(self), fields(barcode = %barcode))]
    pub async fn pay(&self, barcode: Barcode, quantity: u32) -> Result<String, PaymentError> {
        // Held across the transition so a success cannot slip between the
        // check and the scheduled reload.
        let pending_reload = self.pending_reload.lock().await;
        if pending_reload.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(PaymentError::AwaitingReload);
        }
        let started = self.status.send_if_modified(|status| {
            if status.is_pending() {
                return false;
            }
            *status = PaymentStatus::Pending {
                barcode: barcode.clone(),
                quantity,
            };
            true
        });
        drop(pending_reload);
        if !started {
            return Err(PaymentError::InFlight);
        }

        let guard = PendingGuard {
            status: &self.status,
            barcode: barcode.clone(),
            armed: true,
        };

        match self.session.client().pay(&barcode, quantity).await {
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| DEFAULT_SUCCESS_MESSAGE.to_owned());
                info!(quantity, %message, "payment succeeded");
                let mut pending_reload = self.pending_reload.lock().await;
                self.schedule_reload(&mut pending_reload);
                guard.settle(PaymentStatus::Succeeded {
                    barcode,
                    message: message.clone(),
                });
                drop(pending_reload);
                Ok(message)
            }
            Err(e) => {
                let err = PaymentError::from_api(e);
                warn!(quantity, error = %err, "payment failed");
                guard.settle(PaymentStatus::Failed {
                    barcode,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Whether a paid session is still waiting to be discarded.
    pub async fn reload_pending(&self) -> bool {
        self.pending_reload
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Discard the session once the reload delay has passed.
    fn schedule_reload(&self, slot: &mut Option<JoinHandle<()>>) {
        let session = self.session.clone();
        let delay = self.reload_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = session.discard_and_reload().await {
                error!(error = %e, "reload after payment failed");
            }
        });

        if let Some(previous) = slot.replace(handle) {
            // Superseded by this reload
            previous.abort();
        }
    }

    /// Wait for a scheduled post-payment reload to finish.
    ///
    /// Payments arriving meanwhile wait behind the reload.
    pub async fn settle(&self) {
        let mut slot = self.pending_reload.lock().await;
        let Some(handle) = slot.as_mut() else {
            return;
        };
        match handle.await {
            Err(e) if !e.is_cancelled() => error!(error = %e, "reload task panicked"),
            _ => {}
        }
        *slot = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_keeps_server_message() {
        let err = PaymentError::from_api(CatalogApiError::Status {
            status: 400,
            message: Some("Stok tidak cukup".to_owned()),
        });
        assert!(matches!(err, PaymentError::Rejected { status: 400, .. }));
        assert_eq!(err.to_string(), "Stok tidak cukup");
    }

    #[test]
    fn test_rejection_without_body_has_fallback() {
        let err = PaymentError::from_api(CatalogApiError::Status {
            status: 502,
            message: None,
        });
        assert_eq!(err.to_string(), "Payment failed (HTTP 502)");
    }

    #[test]
    fn test_parse_errors_are_transport_errors() {
        let err = PaymentError::from_api(CatalogApiError::Parse("eof".to_owned()));
        assert!(matches!(err, PaymentError::Transport(_)));
    }

    #[test]
    fn test_dropped_guard_fails_pending_status() {
        let barcode = Barcode::parse("A").unwrap();
        let (status, receiver) = watch::channel(PaymentStatus::Pending {
            barcode: barcode.clone(),
            quantity: 1,
        });
        drop(PendingGuard {
            status: &status,
            barcode,
            armed: true,
        });
        assert!(matches!(*receiver.borrow(), PaymentStatus::Failed { .. }));
    }
}
