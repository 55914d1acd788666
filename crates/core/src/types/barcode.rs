//! Barcode type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Barcode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BarcodeError {
    /// The input is empty after trimming whitespace.
    #[error("barcode cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("barcode must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a control character.
    #[error("barcode cannot contain control characters")]
    ControlCharacter,
}

/// A product barcode.
///
/// Barcodes are the immutable key of every product and cart line. The value
/// is whatever the decoder or the keyboard produced (EAN-13, UPC-A, QR text),
/// so no symbology checks are applied beyond basic hygiene.
///
/// ## Constraints
///
/// - Surrounding whitespace is trimmed (line-oriented scanners append `\r\n`)
/// - Length: 1-128 characters
/// - No control characters
///
/// ## Examples
///
/// ```
/// use apotek_core::Barcode;
///
/// assert_eq!(Barcode::parse(" 8991234567890\r\n").unwrap().as_str(), "8991234567890");
/// assert!(Barcode::parse("").is_err());
/// assert!(Barcode::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Barcode(String);

impl Barcode {
    /// Maximum length of a barcode.
    pub const MAX_LENGTH: usize = 128;

    /// Parse a `Barcode` from scanned or typed text.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, longer than
    /// [`Self::MAX_LENGTH`], or contains control characters.
    pub fn parse(s: &str) -> Result<Self, BarcodeError> {
        let s = s.trim();

        if s.is_empty() {
            return Err(BarcodeError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(BarcodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(char::is_control) {
            return Err(BarcodeError::ControlCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the barcode as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Barcode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Barcode {
    type Err = BarcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Barcode {
    type Error = BarcodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Barcode> for String {
    fn from(barcode: Barcode) -> Self {
        barcode.0
    }
}

impl AsRef<str> for Barcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Barcode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Barcode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
