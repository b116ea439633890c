//! authwatch CLI library
//!
//! Core library components for the `authwatch` audit viewer.

pub mod args;
pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
