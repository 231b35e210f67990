//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for driving the lci CLI against a queue file.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use lci_storage::FileQueueStore;

/// Returns the path to a binary, checking the llvm-cov target directory first
/// and falling back to the directory of the test binary itself.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug").join(name);
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn lci_binary() -> PathBuf {
    binary_path("lci")
}

/// CLI builder for fluent test assertions
pub struct CliBuilder {
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new() -> Self {
        Self {
            args: Vec::new(),
            envs: vec![("NO_COLOR".into(), "1".into())],
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<Path>) -> Self {
        self.envs.push((
            key.to_string(),
            value.as_ref().to_string_lossy().to_string(),
        ));
        self
    }

    pub fn command(self) -> Command {
        let mut cmd = Command::new(lci_binary());
        cmd.args(&self.args);
        // Parent settings must not leak into tests
        for var in ["LCI_QUEUE", "LCI_STATE_DIR", "LCI_AGENT_TTL_SECS", "COLOR"] {
            cmd.env_remove(var);
        }
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect failure (non-zero exit code)
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            !output.status.success(),
            "expected command to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

pub fn cli() -> CliBuilder {
    CliBuilder::new()
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout equals expected exactly (with diff on failure).
    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            !stdout.contains(unexpected),
            "stdout should not contain '{}'\nstdout: {}",
            unexpected,
            stdout
        );
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout()).expect("stdout should be JSON")
    }
}

// =============================================================================
// Workspace
// =============================================================================

/// Temporary directory holding a queue file and job files.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn queue_path(&self) -> PathBuf {
        self.path().join("state/queue.json")
    }

    /// Write a file relative to the workspace and return its path
    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a job file for `id` and return its path
    pub fn job(&self, id: &str) -> PathBuf {
        self.file(&format!("{id}.toml"), &job_toml(id))
    }

    /// The same queue the CLI operates on
    pub fn store(&self) -> FileQueueStore {
        FileQueueStore::open(self.queue_path(), chrono::Duration::seconds(60)).unwrap()
    }

    /// Run lci against this workspace's queue
    pub fn lci(&self) -> CliBuilder {
        cli().env("LCI_QUEUE", self.queue_path())
    }
}

/// Job file with a pinned assignment commit.
pub fn job_toml(id: &str) -> String {
    format!(
        r#"id = "{id}"
name = "build {id}"

[repository_info]
triggered_by_push_to = "ASSIGNMENT"
assignment_repository_uri = "https://artemis.test/git/PROG/prog-student1.git"
test_repository_uri = "https://artemis.test/git/PROG/prog-tests.git"

[build_config]
docker_image = "ls1tum/artemis-maven-template:java17-20"
build_script = "./gradlew clean test"
branch = "main"
assignment_commit_hash = "hash-{id}"
test_commit_hash = "e5f6a7b8"
result_paths = ["build/test-results/test/*.xml"]
"#
    )
}
