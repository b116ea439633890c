//! Configuration types for authwatch.
//!
//! This crate provides the configuration used by the audit engine,
//! read from `.authwatch/config.yaml` files.

pub mod env;
pub mod loader;
pub mod types;

pub use env::*;
pub use loader::*;
pub use types::*;
