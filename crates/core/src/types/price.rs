//! Whole-unit price representation.
//!
//! The counter trades in rupiah, which has no minor unit in practice, so a
//! price is a plain non-negative integer. Display follows Indonesian
//! conventions: `Rp` prefix and `.` as the thousands separator.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A non-negative price in whole currency units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(0);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Get the amount in whole units.
    #[must_use]
    pub const fn amount(self) -> u64 {
        self.0
    }

    /// Price of `quantity` units, saturating at `u64::MAX`.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(u64::from(quantity)))
    }

    /// Sum of two prices, saturating at `u64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Parse a price from free-form input by keeping only its digits.
    ///
    /// Admin forms display prices formatted (`Rp 12.500`), so edits come back
    /// with separators and a currency prefix. Returns `None` when the input
    /// holds no digits or the value overflows.
    ///
    /// ```
    /// use apotek_core::Price;
    ///
    /// assert_eq!(Price::parse_lenient("Rp 12.500"), Some(Price::new(12_500)));
    /// assert_eq!(Price::parse_lenient("abc"), None);
    /// ```
    #[must_use]
    pub fn parse_lenient(input: &str) -> Option<Self> {
        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return None;
        }
        digits.parse::<u64>().ok().map(Self)
    }

    /// Format for display (e.g., "Rp 12.500").
    #[must_use]
    pub fn display(self) -> String {
        let digits = self.0.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        format!("Rp {grouped}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Price {
    fn from(amount: u64) -> Self {
        Self(amount)
    }
}

impl From<Price> for u64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::new(0).display(), "Rp 0");
        assert_eq!(Price::new(950).display(), "Rp 950");
        assert_eq!(Price::new(1_000).display(), "Rp 1.000");
        assert_eq!(Price::new(12_500).display(), "Rp 12.500");
        assert_eq!(Price::new(1_250_000).display(), "Rp 1.250.000");
    }

    #[test]
    fn test_plain_display_is_digits() {
        // Search matches against the stringified price, not the formatted one
        assert_eq!(Price::new(12_500).to_string(), "12500");
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Price::parse_lenient("12500"), Some(Price::new(12_500)));
        assert_eq!(Price::parse_lenient("Rp 1.250.000"), Some(Price::new(1_250_000)));
        assert_eq!(Price::parse_lenient(""), None);
        assert_eq!(Price::parse_lenient("Rp"), None);
        assert_eq!(Price::parse_lenient("99999999999999999999999"), None);
    }

    #[test]
    fn test_times_and_sum() {
        let line = Price::new(10).times(3);
        assert_eq!(line, Price::new(30));
        assert_eq!(line.saturating_add(Price::new(5)), Price::new(35));
        assert_eq!(Price::new(u64::MAX).times(2), Price::new(u64::MAX));
    }
}
