// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test builders for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    AgentIdentity, BuildAgentInformation, BuildAgentStatus, BuildConfig, BuildJobId, BuildJobQueueItem, BuildStatus, JobTimingInfo,
    ProgrammingLanguage, RepositoryInfo, RepositoryType, RepositoryUri,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Fixed instant all builders count from.
pub fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::days(20_000)
}

pub fn uri(slug: &str) -> RepositoryUri {
    match RepositoryUri::parse(&format!("https://artemis.test/git/PROG/{}.git", slug)) {
        Ok(uri) => uri,
        Err(e) => unreachable!("test uri for {slug}: {e}"),
    }
}

pub fn repository_info() -> RepositoryInfo {
    RepositoryInfo {
        repository_name: "prog-student1".to_string(),
        triggered_by_push_to: RepositoryType::Assignment,
        assignment_repository_uri: uri("prog-student1"),
        test_repository_uri: uri("prog-tests"),
        solution_repository_uri: None,
        auxiliary_repository_uris: Vec::new(),
        auxiliary_repository_checkout_directories: Vec::new(),
    }
}

pub fn build_config() -> BuildConfig {
    BuildConfig {
        docker_image: "ls1tum/artemis-maven-template:java17-20".to_string(),
        build_script: "#!/usr/bin/env bash\n./gradlew clean test".to_string(),
        branch: "main".to_string(),
        assignment_commit_hash: Some("a1b2c3d4".to_string()),
        test_commit_hash: Some("e5f6a7b8".to_string()),
        result_paths: vec!["build/test-results/test/*.xml".to_string()],
        programming_language: ProgrammingLanguage::Java,
        timeout_secs: None,
        assignment_checkout_path: None,
        test_checkout_path: None,
        solution_checkout_path: None,
        docker_run_config: None,
    }
}

/// Queued job submitted at [`epoch`] with priority 2.
pub fn build_job(id: &str) -> BuildJobQueueItem {
    BuildJobQueueItem {
        id: BuildJobId::new(id),
        name: format!("build {}", id),
        build_agent: None,
        priority: 2,
        course_id: 1,
        exercise_id: 10,
        participation_id: 100,
        retry_count: 0,
        status: BuildStatus::Queued,
        repository_info: repository_info(),
        timing: JobTimingInfo::submitted_at(epoch()),
        build_config: build_config(),
    }
}

pub fn agent_identity(name: &str) -> AgentIdentity {
    AgentIdentity {
        name: name.to_string(),
        member_address: format!("{}@127.0.0.1", name),
        display_name: name.to_string(),
    }
}

/// Idle agent with two build slots, last seen at `heartbeat`.
pub fn agent_info(name: &str, heartbeat: DateTime<Utc>) -> BuildAgentInformation {
    BuildAgentInformation {
        build_agent: agent_identity(name),
        max_concurrent_builds: 2,
        running_build_jobs: Vec::new(),
        status: BuildAgentStatus::Idle,
        recent_build_jobs: VecDeque::new(),
        public_ssh_key: None,
        last_heartbeat: heartbeat,
    }
}
