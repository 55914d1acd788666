//! Cancellation of active decode sessions.
//!
//! Every session runs under a [`ScanTicket`] whose token is a child of the
//! server's shutdown token. Cancelling one ticket, every ticket, or the
//! shutdown token ends the matching sessions and releases the device.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

type Sessions = Arc<Mutex<HashMap<Uuid, CancellationToken>>>;

/// Registry of active decode sessions.
#[derive(Clone)]
pub struct ScanControl {
    shutdown: CancellationToken,
    active: Sessions,
}

impl ScanControl {
    #[must_use]
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            shutdown,
            active: Arc::default(),
        }
    }

    /// Register a new session.
    #[must_use]
    pub fn begin(&self) -> ScanTicket {
        let id = Uuid::new_v4();
        let token = self.shutdown.child_token();
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, token.clone());
        debug!(session = %id, "decode session started");

        ScanTicket {
            id,
            token,
            active: Arc::clone(&self.active),
        }
    }

    /// Cancel every active session, returning how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        for token in active.values() {
            token.cancel();
        }
        active.len()
    }

    /// Number of active sessions.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One registered session. Dropping it deregisters the session.
pub struct ScanTicket {
    id: Uuid,
    token: CancellationToken,
    active: Sessions,
}

impl ScanTicket {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The token the session must observe.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for ScanTicket {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        debug!(session = %self.id, "decode session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tickets_deregister_on_drop() {
        let control = ScanControl::new(CancellationToken::new());
        let first = control.begin();
        let second = control.begin();
        assert_eq!(control.active(), 2);

        drop(first);
        assert_eq!(control.active(), 1);
        drop(second);
        assert_eq!(control.active(), 0);
    }

    #[test]
    fn test_cancel_all() {
        let control = ScanControl::new(CancellationToken::new());
        let ticket = control.begin();
        assert_eq!(control.cancel_all(), 1);
        assert!(ticket.token().is_cancelled());

        // New sessions are unaffected
        assert!(!control.begin().token().is_cancelled());
    }

    #[test]
    fn test_shutdown_cancels_sessions() {
        let shutdown = CancellationToken::new();
        let control = ScanControl::new(shutdown.clone());
        let ticket = control.begin();
        shutdown.cancel();
        assert!(ticket.token().is_cancelled());
    }
}
