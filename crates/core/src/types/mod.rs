//! Core types for Apotek.
//!
//! This module provides type-safe wrappers for the counter's domain concepts.

pub mod barcode;
pub mod cart;
pub mod price;
pub mod product;
pub mod status;

pub use barcode::{Barcode, BarcodeError};
pub use cart::{CartItem, CartTotals, QuantityOp};
pub use price::Price;
pub use product::{Product, ProductForm, ProductPatch, ProductPatchForm, ValidationError};
pub use status::*;
