// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository references carried by a build job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which repository a push that triggered the build went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryType {
    Assignment,
    Tests,
    Solution,
    Auxiliary,
    Template,
}

impl RepositoryType {
    /// Pushes to these repositories must not pin the assignment checkout to
    /// the pushed commit: the hash belongs to a different repository.
    pub fn pins_assignment_commit(self) -> bool {
        !matches!(self, RepositoryType::Tests | RepositoryType::Auxiliary)
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RepositoryType::Assignment => "assignment",
            RepositoryType::Tests => "tests",
            RepositoryType::Solution => "solution",
            RepositoryType::Auxiliary => "auxiliary",
            RepositoryType::Template => "template",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryUriError {
    #[error("repository uri is empty")]
    Empty,
    #[error("repository uri {0} has no repository name")]
    MissingSlug(String),
    #[error("repository uri {0} does not name a repository folder")]
    InvalidSlug(String),
}

/// Clone URI of a repository.
///
/// The last path segment (without a trailing `.git`) is the repository slug,
/// which also names the local checkout folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryUri {
    uri: String,
    slug_start: usize,
    slug_end: usize,
}

impl RepositoryUri {
    pub fn parse(uri: &str) -> Result<Self, RepositoryUriError> {
        let trimmed = uri.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(RepositoryUriError::Empty);
        }
        let slug_start = trimmed
            .rfind(['/', ':'])
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let tail = &trimmed[slug_start..];
        let slug_len = tail.strip_suffix(".git").unwrap_or(tail).len();
        if slug_len == 0 {
            return Err(RepositoryUriError::MissingSlug(uri.to_string()));
        }
        if !is_folder_name(&tail[..slug_len]) {
            return Err(RepositoryUriError::InvalidSlug(uri.to_string()));
        }
        Ok(Self {
            uri: trimmed.to_string(),
            slug_start,
            slug_end: slug_start + slug_len,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Repository name, e.g. `prog1-exercise-student1` for
    /// `https://host/git/PROG1/prog1-exercise-student1.git`.
    pub fn slug(&self) -> &str {
        &self.uri[self.slug_start..self.slug_end]
    }

    /// Name of the local folder the repository is cloned into.
    pub fn folder_name(&self) -> &str {
        self.slug()
    }
}

/// The slug names a checkout folder, so it must stay a single plain component.
fn is_folder_name(slug: &str) -> bool {
    slug != "." && slug != ".." && !slug.contains(['\\', '\0'])
}

impl fmt::Display for RepositoryUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl FromStr for RepositoryUri {
    type Err = RepositoryUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RepositoryUri {
    type Error = RepositoryUriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepositoryUri> for String {
    fn from(value: RepositoryUri) -> Self {
        value.uri
    }
}

/// Repositories that take part in one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub repository_name: String,
    pub triggered_by_push_to: RepositoryType,
    pub assignment_repository_uri: RepositoryUri,
    pub test_repository_uri: RepositoryUri,
    #[serde(default)]
    pub solution_repository_uri: Option<RepositoryUri>,
    #[serde(default)]
    pub auxiliary_repository_uris: Vec<RepositoryUri>,
    /// In-container checkout directory for each auxiliary repository, by index.
    #[serde(default)]
    pub auxiliary_repository_checkout_directories: Vec<String>,
}

impl RepositoryInfo {
    /// Auxiliary repositories paired with their checkout directory.
    pub fn auxiliary_repositories(&self) -> impl Iterator<Item = (&RepositoryUri, &str)> {
        self.auxiliary_repository_uris
            .iter()
            .zip(self.auxiliary_repository_checkout_directories.iter())
            .map(|(uri, dir)| (uri, dir.as_str()))
    }

    /// True when the solution lives in the assignment repository itself.
    pub fn solution_is_assignment(&self) -> bool {
        self.solution_repository_uri
            .as_ref()
            .is_some_and(|s| s.slug() == self.assignment_repository_uri.slug())
    }
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
