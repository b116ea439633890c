//! Common test utilities for CLI testing.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

/// Test context with a temporary project directory and database.
pub struct TestContext {
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
}

impl TestContext {
    pub fn new() -> Self {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("audit.db");
        Self { temp_dir, db_path }
    }

    /// Write `.authwatch/config.yaml` in the project directory.
    pub fn with_config(self, yaml: &str) -> Self {
        let dir = self.path().join(".authwatch");
        std::fs::create_dir_all(&dir).expect("Failed to create config dir");
        std::fs::write(dir.join("config.yaml"), yaml).expect("Failed to write config");
        self
    }

    /// Get path to temp directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a command configured for this context
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("authwatch").expect("Binary not found");
        cmd.current_dir(self.path())
            .env_remove("AUTHWATCH_CONFIG")
            .env_remove("AUTHWATCH_DB_PATH")
            .env("AUTHWATCH_LOG_LEVEL", "error")
            .env("NO_COLOR", "1")
            .arg("--db")
            .arg(&self.db_path);
        cmd
    }

    /// Run a command expecting success and return stdout.
    pub fn run(&self, args: &[&str]) -> String {
        let output = self.command().args(args).output().expect("Failed to run command");
        assert!(
            output.status.success(),
            "command {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).expect("stdout is not UTF-8")
    }

    /// Run a command with `--output-format json` and parse stdout.
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let mut args = args.to_vec();
        args.extend(["--output-format", "json"]);
        serde_json::from_str(&self.run(&args)).expect("stdout is not JSON")
    }
}
