//! authwatch common core types and utilities.

pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{from_micros, to_micros, truncate_to_micros, TimeRange};
