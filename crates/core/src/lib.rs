//! Apotek Core - inventory and cart reconciliation engine.
//!
//! This crate provides the in-memory model shared by every Apotek component:
//! - `counter` - Customer-facing and admin HTTP surfaces for the shop counter
//! - `cli` - Command-line tools for catalog management
//!
//! # Architecture
//!
//! The core crate contains only types and state machines - no I/O, no HTTP
//! clients, no async runtime. Callers fetch data from the catalog service and
//! hand it to [`Inventory`], which keeps the product mirror and the cart
//! consistent with each other.
//!
//! # Modules
//!
//! - [`types`] - Barcodes, products, prices, cart lines and statuses
//! - [`catalog`] - Local mirror of the remote product catalog
//! - [`cart`] - Cart lines paired with catalog stock adjustments
//! - [`search`] - Derived, per-surface search results
//! - [`inventory`] - Catalog and cart guarded as one unit, refresh policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod inventory;
pub mod search;
pub mod types;

pub use cart::{CartError, CartStore, QuantityChange};
pub use catalog::{CatalogError, ProductCatalog};
pub use inventory::{Inventory, RefreshReport, ReservationAdjustment};
pub use search::{SearchFilter, SortKey, SortOrder, sort_products};
pub use types::*;
