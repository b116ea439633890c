//! Test utilities for authwatch crates.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::PathBuf;
use tempfile::TempDir;

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a temporary directory and a database path inside it.
///
/// Keep the returned `TempDir` alive for as long as the database is in use.
pub fn temp_db_path() -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let path = dir.path().join("audit.db");
    (dir, path)
}

/// A fixed UTC timestamp on the reference day (2024-06-03, a Monday).
pub fn at(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, hour, minute, second)
        .single()
        .expect("valid reference timestamp")
}

/// `base` shifted by `secs` seconds.
pub fn plus_secs(base: DateTime<Utc>, secs: i64) -> DateTime<Utc> {
    base + Duration::seconds(secs)
}

/// Macro for async tests with tokio runtime.
#[macro_export]
macro_rules! async_test {
    ($name:ident, $body:expr) => {
        #[tokio::test]
        async fn $name() {
            $body
        }
    };
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    };
}
