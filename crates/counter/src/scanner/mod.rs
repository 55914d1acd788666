//! Barcode capture and resolution.
//!
//! A [`CaptureDevice`] hands out a [`DecodeFeed`] of raw decoded text. The
//! [`BarcodeResolver`] owns the device exclusively for the length of a decode
//! session, forwards every read to the catalog lookup, and releases the device
//! on every exit path: success, cancellation, error, or the caller dropping
//! the session.
//!
//! Two session shapes exist:
//! - [`BarcodeResolver::decode_once`] resolves on the first good read.
//! - [`BarcodeResolver::decode_continuous`] yields reads until cancelled.

mod control;
mod line;

use std::future::Future;
use std::sync::Arc;

use apotek_core::Product;
use futures::Stream;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::session::CatalogSession;

pub use control::{ScanControl, ScanTicket};
pub use line::{LineDevice, LineFeed};

/// Errors from decode sessions.
#[derive(Debug, Error)]
pub enum ScanError {
    /// No scanner is configured on this counter.
    #[error("no barcode scanner is configured")]
    NotConfigured,

    /// Another decode session holds the device.
    #[error("the scanner is busy with another session")]
    Busy,

    /// The device could not be opened.
    #[error("scanner unavailable: {0}")]
    Unavailable(String),

    /// One read could not be decoded. Sessions skip these and keep reading.
    #[error("could not decode barcode: {0}")]
    Decode(String),

    /// The device failed mid-session.
    #[error("scanner error: {0}")]
    Device(String),

    /// The device stopped producing reads.
    #[error("scanner closed")]
    Closed,

    /// The session was cancelled.
    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// Returns true for errors a session skips over.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// A source of decoded barcode text, such as a camera with a decoder or a
/// keyboard-wedge scanner.
pub trait CaptureDevice: Send + Sync + 'static {
    type Feed: DecodeFeed;

    /// Open the device for one decode session.
    fn acquire(&self) -> impl Future<Output = Result<Self::Feed, ScanError>> + Send;
}

/// An open device producing reads.
pub trait DecodeFeed: Send + 'static {
    /// Wait for the next read. `Ok(None)` means the device closed.
    fn next_decode(&mut self) -> impl Future<Output = Result<Option<String>, ScanError>> + Send;

    /// Stop capturing and give the device back. Called exactly once.
    fn release(&mut self);
}

/// Exclusive, scoped ownership of an open feed.
///
/// Dropping the lease releases the device.
pub struct CaptureLease<F: DecodeFeed> {
    feed: F,
    _exclusive: OwnedMutexGuard<()>,
}

impl<F: DecodeFeed> CaptureLease<F> {
    async fn next_decode(&mut self) -> Result<Option<String>, ScanError> {
        self.feed.next_decode().await
    }
}

impl<F: DecodeFeed> Drop for CaptureLease<F> {
    fn drop(&mut self) {
        self.feed.release();
        debug!("capture device released");
    }
}

/// One decoded read and the product it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanEvent {
    /// Raw decoded text, trimmed.
    pub barcode: String,
    /// The matching product, if one is loaded.
    pub product: Option<Product>,
}

/// Runs decode sessions against one device and the shared catalog.
pub struct BarcodeResolver<D: CaptureDevice> {
    device: Arc<D>,
    session: CatalogSession,
    exclusive: Arc<Mutex<()>>,
}

impl<D: CaptureDevice> Clone for BarcodeResolver<D> {
    fn clone(&self) -> Self {
        Self {
            device: Arc::clone(&self.device),
            session: self.session.clone(),
            exclusive: Arc::clone(&self.exclusive),
        }
    }
}

impl<D: CaptureDevice> BarcodeResolver<D> {
    #[must_use]
    pub fn new(device: D, session: CatalogSession) -> Self {
        Self {
            device: Arc::new(device),
            session,
            exclusive: Arc::new(Mutex::new(())),
        }
    }

    /// Take the device for a session.
    async fn lease(
        device: &D,
        exclusive: &Arc<Mutex<()>>,
    ) -> Result<CaptureLease<D::Feed>, ScanError> {
        let guard = Arc::clone(exclusive)
            .try_lock_owned()
            .map_err(|_| ScanError::Busy)?;
        let feed = device.acquire().await?;
        debug!("capture device acquired");
        Ok(CaptureLease {
            feed,
            _exclusive: guard,
        })
    }

    /// Look up decoded text in the catalog.
    pub async fn resolve(&self, raw: &str) -> ScanEvent {
        resolve(&self.session, raw).await
    }

    /// Resolve the first good read, then release the device.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Cancelled`] if `cancel` fires first, or the
    /// device error that ended the session.
    #[instrument(skip_all)]
    pub async fn decode_once(&self, cancel: CancellationToken) -> Result<ScanEvent, ScanError> {
        let mut lease = tokio::select! {
            () = cancel.cancelled() => return Err(ScanError::Cancelled),
            lease = Self::lease(&self.device, &self.exclusive) => lease?,
        };

        let raw = loop {
            let read = tokio::select! {
                () = cancel.cancelled() => return Err(ScanError::Cancelled),
                read = lease.next_decode() => read,
            };
            match read {
                Ok(Some(raw)) => break raw,
                Ok(None) => return Err(ScanError::Closed),
                Err(e) if e.is_transient() => warn!(error = %e, "skipping unreadable scan"),
                Err(e) => return Err(e),
            }
        };
        drop(lease);

        Ok(self.resolve(&raw).await)
    }

    /// Resolve reads until `cancel` fires or the device closes.
    ///
    /// The device is held for as long as the stream is alive. A fatal error
    /// is yielded once and ends the stream; cancellation ends it quietly.
    pub fn decode_continuous(
        &self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ScanEvent, ScanError>> + Send + use<D> {
        let resolver = self.clone();

        async_stream::stream! {
            let lease = tokio::select! {
                () = cancel.cancelled() => return,
                lease = Self::lease(&resolver.device, &resolver.exclusive) => lease,
            };
            let mut lease = match lease {
                Ok(lease) => lease,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            loop {
                let read = tokio::select! {
                    () = cancel.cancelled() => break,
                    read = lease.next_decode() => read,
                };
                match read {
                    Ok(Some(raw)) => yield Ok(resolve(&resolver.session, &raw).await),
                    Ok(None) => break,
                    Err(e) if e.is_transient() => warn!(error = %e, "skipping unreadable scan"),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    }
}

async fn resolve(session: &CatalogSession, raw: &str) -> ScanEvent {
    let barcode = raw.trim().to_owned();
    let product = session.lookup(&barcode).await;
    if product.is_none() {
        debug!(%barcode, "scanned barcode not in catalog");
    }
    ScanEvent { barcode, product }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use apotek_core::RefreshPolicy;
    use futures::StreamExt;
    use url::Url;

    use super::*;
    use crate::catalog_api::CatalogClient;

    /// Replays scripted reads, then blocks forever.
    struct ScriptedDevice {
        reads: std::sync::Mutex<VecDeque<Result<String, ScanError>>>,
        released: Arc<AtomicUsize>,
    }

    struct ScriptedFeed {
        reads: VecDeque<Result<String, ScanError>>,
        released: Arc<AtomicUsize>,
    }

    impl ScriptedDevice {
        fn new(reads: Vec<Result<String, ScanError>>) -> Self {
            Self {
                reads: std::sync::Mutex::new(reads.into()),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl CaptureDevice for ScriptedDevice {
        type Feed = ScriptedFeed;

        async fn acquire(&self) -> Result<ScriptedFeed, ScanError> {
            Ok(ScriptedFeed {
                reads: std::mem::take(&mut *self.reads.lock().unwrap()),
                released: Arc::clone(&self.released),
            })
        }
    }

    impl DecodeFeed for ScriptedFeed {
        async fn next_decode(&mut self) -> Result<Option<String>, ScanError> {
            match self.reads.pop_front() {
                Some(read) => read.map(Some),
                None => std::future::pending().await,
            }
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn resolver(
        reads: Vec<Result<String, ScanError>>,
    ) -> (BarcodeResolver<ScriptedDevice>, Arc<AtomicUsize>) {
        let client = CatalogClient::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            Duration::from_secs(1),
        )
        .unwrap();
        let session = CatalogSession::new(client, RefreshPolicy::Reserve);
        let device = ScriptedDevice::new(reads);
        let released = Arc::clone(&device.released);
        (BarcodeResolver::new(device, session), released)
    }

    #[tokio::test]
    async fn test_decode_once_skips_transient_errors() {
        let (resolver, released) = resolver(vec![
            Err(ScanError::Decode("blurred".to_owned())),
            Ok(" 8991001\n".to_owned()),
        ]);

        let event = resolver.decode_once(CancellationToken::new()).await.unwrap();
        assert_eq!(event.barcode, "8991001");
        assert!(event.product.is_none());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_once_releases_on_error() {
        let (resolver, released) = resolver(vec![Err(ScanError::Device("unplugged".to_owned()))]);

        let err = resolver.decode_once(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ScanError::Device(_)));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_decode_once_releases_on_cancel() {
        let (resolver, released) = resolver(Vec::new());
        let cancel = CancellationToken::new();

        let session = tokio::spawn({
            let resolver = resolver.clone();
            let cancel = cancel.clone();
            async move { resolver.decode_once(cancel).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let err = session.await.unwrap().unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_device_is_exclusive() {
        let (resolver, released) = resolver(Vec::new());
        let cancel = CancellationToken::new();

        let first = tokio::spawn({
            let resolver = resolver.clone();
            let cancel = cancel.clone();
            async move { resolver.decode_once(cancel).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let err = resolver.decode_once(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ScanError::Busy));

        cancel.cancel();
        assert!(first.await.unwrap().is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_continuous_yields_until_cancelled() {
        let (resolver, released) = resolver(vec![
            Ok("A".to_owned()),
            Err(ScanError::Decode("glare".to_owned())),
            Ok("B".to_owned()),
        ]);
        let cancel = CancellationToken::new();
        let mut stream = Box::pin(resolver.decode_continuous(cancel.clone()));

        assert_eq!(stream.next().await.unwrap().unwrap().barcode, "A");
        assert_eq!(stream.next().await.unwrap().unwrap().barcode, "B");
        assert_eq!(released.load(Ordering::SeqCst), 0);

        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropping_continuous_stream_releases() {
        let (resolver, released) = resolver(vec![Ok("A".to_owned())]);
        let mut stream = Box::pin(resolver.decode_continuous(CancellationToken::new()));
        assert!(stream.next().await.is_some());

        drop(stream);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
