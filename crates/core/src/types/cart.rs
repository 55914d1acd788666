//! Cart line types.

use serde::{Deserialize, Serialize};

use super::barcode::Barcode;
use super::price::Price;
use super::product::Product;

/// A product held in the cart.
///
/// `price` is a snapshot taken when the line was created; later catalog edits
/// do not reprice lines that are already held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub barcode: Barcode,
    pub name: String,
    pub price: Price,
    /// Always at least 1 while the line exists.
    pub quantity: u32,
}

impl CartItem {
    /// A new line holding one unit of `product`.
    #[must_use]
    pub fn first_unit(product: &Product) -> Self {
        Self {
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity: 1,
        }
    }

    /// `price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Aggregates over the current cart lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    /// Sum of quantities.
    pub total_items: u64,
    /// Sum of line subtotals.
    pub total_price: Price,
}

/// Quantity change requested from the cart controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityOp {
    Increment,
    Decrement,
}

impl std::str::FromStr for QuantityOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "increment" => Ok(Self::Increment),
            "decrement" => Ok(Self::Decrement),
            other => Err(format!("unknown quantity operation: {other}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subtotal() {
        let item = CartItem {
            barcode: Barcode::parse("A").unwrap(),
            name: "X".to_owned(),
            price: Price::new(10),
            quantity: 3,
        };
        assert_eq!(item.subtotal(), Price::new(30));
    }

    #[test]
    fn test_quantity_op_wire_format() {
        assert_eq!(
            serde_json::to_string(&QuantityOp::Increment).unwrap(),
            "\"increment\""
        );
        let op: QuantityOp = serde_json::from_str("\"decrement\"").unwrap();
        assert_eq!(op, QuantityOp::Decrement);
        assert_eq!("increment".parse::<QuantityOp>(), Ok(QuantityOp::Increment));
        assert!("double".parse::<QuantityOp>().is_err());
    }
}
