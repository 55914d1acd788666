//! Line-oriented decoder devices.
//!
//! Many USB and serial scanners decode on-device and emit one barcode per
//! line. Reading the device node (or a FIFO fed by a camera decoder) gives a
//! feed of raw barcode text.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use super::{CaptureDevice, DecodeFeed, ScanError};

/// A decoder that writes one barcode per line to a file-like path.
#[derive(Debug, Clone)]
pub struct LineDevice {
    path: PathBuf,
}

impl LineDevice {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CaptureDevice for LineDevice {
    type Feed = LineFeed;

    async fn acquire(&self) -> Result<LineFeed, ScanError> {
        let file = File::open(&self.path).await.map_err(|e| {
            ScanError::Unavailable(format!("{}: {e}", self.path.display()))
        })?;
        debug!(path = %self.path.display(), "scanner opened");
        Ok(LineFeed {
            lines: Some(BufReader::new(file).lines()),
        })
    }
}

/// An open line device.
pub struct LineFeed {
    lines: Option<Lines<BufReader<File>>>,
}

impl DecodeFeed for LineFeed {
    async fn next_decode(&mut self) -> Result<Option<String>, ScanError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {
                Err(ScanError::Decode("empty read".to_owned()))
            }
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => Ok(None),
            // Invalid UTF-8 is a misread, not a dead device
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(ScanError::Decode(e.to_string()))
            }
            Err(e) => Err(ScanError::Device(e.to_string())),
        }
    }

    fn release(&mut self) {
        // Closing the handle hands the device back to the OS
        self.lines = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("apotek-{name}-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_reads_lines_then_closes() {
        let path = temp_path("scanner");
        tokio::fs::write(&path, "8991001\n\nQR-VIT-C\n").await.unwrap();

        let mut feed = LineDevice::new(&path).acquire().await.unwrap();
        assert_eq!(feed.next_decode().await.unwrap().as_deref(), Some("8991001"));
        assert!(matches!(feed.next_decode().await, Err(ScanError::Decode(_))));
        assert_eq!(feed.next_decode().await.unwrap().as_deref(), Some("QR-VIT-C"));
        assert!(feed.next_decode().await.unwrap().is_none());

        feed.release();
        assert!(feed.next_decode().await.unwrap().is_none());
        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_device_is_unavailable() {
        let result = LineDevice::new(temp_path("missing")).acquire().await;
        assert!(matches!(result, Err(ScanError::Unavailable(_))));
    }
}
