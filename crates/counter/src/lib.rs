//! Apotek Counter library.
//!
//! This crate provides the counter service as a library, allowing it to be
//! tested and reused. The binary in `main.rs` wires it to the environment.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog_api;
pub mod config;
pub mod error;
pub mod notify;
pub mod payment;
pub mod routes;
pub mod scanner;
pub mod session;
pub mod state;
