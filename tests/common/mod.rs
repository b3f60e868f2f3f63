//! Common test utilities and helpers

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A temporary directory holding configurations for a test.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a file in the test project, returning its path
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Build a command running the workflows binary inside the project, without retries
    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_workflows"));
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env("NO_PROXY", "127.0.0.1,localhost")
            .env("MAX_RETRIES", "0")
            .env("RETRY_DELAY_MS", "0")
            .args(args);
        cmd
    }

    /// Run the workflows binary inside the project with extra environment variables
    pub fn run(&self, args: &[&str], envs: &[(&str, &str)]) -> Output {
        let mut cmd = self.command(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.output().expect("Failed to execute workflows")
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
