// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! How a job is built: image, script, result paths and container limits.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Programming language of the exercise. Only affects default checkout paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgrammingLanguage {
    #[default]
    Java,
    Kotlin,
    Python,
    C,
    Haskell,
    Ocaml,
    Swift,
    Rust,
    Javascript,
    Typescript,
    Go,
    Assembler,
    Vhdl,
    Empty,
}

impl ProgrammingLanguage {
    /// Default in-container checkout locations, relative to the testing directory.
    ///
    /// JVM builds check the test repository out into the working directory itself.
    pub fn default_checkout_paths(self) -> CheckoutPaths {
        let test = match self {
            ProgrammingLanguage::Java | ProgrammingLanguage::Kotlin => "",
            _ => "tests",
        };
        CheckoutPaths {
            assignment: "assignment".to_string(),
            test: test.to_string(),
            solution: "solution".to_string(),
        }
    }
}

/// Resolved checkout locations for a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPaths {
    pub assignment: String,
    pub test: String,
    pub solution: String,
}

/// Per-job container tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerRunConfig {
    #[serde(default)]
    pub network_disabled: bool,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub cpu_count: Option<u32>,
    #[serde(default)]
    pub memory_mb: Option<u64>,
    #[serde(default)]
    pub memory_swap_mb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub docker_image: String,
    pub build_script: String,
    pub branch: String,
    /// Pinned assignment commit; resolved from the branch head when absent.
    #[serde(default)]
    pub assignment_commit_hash: Option<String>,
    #[serde(default)]
    pub test_commit_hash: Option<String>,
    /// Glob paths inside the container whose files are collected as reports.
    #[serde(default)]
    pub result_paths: Vec<String>,
    #[serde(default)]
    pub programming_language: ProgrammingLanguage,
    /// Job deadline; the agent default applies when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub assignment_checkout_path: Option<String>,
    #[serde(default)]
    pub test_checkout_path: Option<String>,
    #[serde(default)]
    pub solution_checkout_path: Option<String>,
    #[serde(default)]
    pub docker_run_config: Option<DockerRunConfig>,
}

impl BuildConfig {
    /// Checkout paths with per-exercise overrides applied.
    ///
    /// A custom test checkout path only applies when the language default is
    /// not the working directory itself.
    pub fn checkout_paths(&self) -> CheckoutPaths {
        let mut paths = self.programming_language.default_checkout_paths();
        if let Some(path) = non_blank(&self.assignment_checkout_path) {
            paths.assignment = path;
        }
        if let Some(path) = non_blank(&self.solution_checkout_path) {
            paths.solution = path;
        }
        if !paths.test.is_empty() {
            if let Some(path) = non_blank(&self.test_checkout_path) {
                paths.test = path;
            }
        }
        paths
    }

    pub fn network_disabled(&self) -> bool {
        self.docker_run_config
            .as_ref()
            .is_some_and(|c| c.network_disabled)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "build_config_tests.rs"]
mod tests;
