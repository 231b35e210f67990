// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::{BuildJobExecutor, BuildLogs, ExecutorConfig, ExecutorDeps, ProcessorConfig, QueueProcessor};
use lci_adapters::container::archive::tar_files;
use lci_adapters::{ContainerCall, FakeContainerAdapter, FakeGitAdapter};
use lci_core::test_support::{agent_identity, build_job};
use lci_core::{BuildJobId, BuildJobQueueItem, FakeClock, SequentialIdGen};
use lci_storage::MemoryQueueStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Convenience alias for the fully-typed test executor.
pub(crate) type TestExecutor =
    BuildJobExecutor<FakeContainerAdapter, FakeGitAdapter, FakeClock, SequentialIdGen>;

pub(crate) const PASSING_REPORT: &str = r#"<testsuite name="Tests"><testcase name="testAdd" classname="CalcTest"/><testcase name="testSub" classname="CalcTest"/></testsuite>"#;
pub(crate) const FAILING_REPORT: &str = r#"<testsuite name="Tests"><testcase name="testDiv" classname="CalcTest"><failure message="expected 2 but was 3"/></testcase></testsuite>"#;

pub(crate) type TestStore = MemoryQueueStore<FakeClock>;

pub(crate) type TestProcessor = QueueProcessor<
    TestStore,
    FakeContainerAdapter,
    FakeGitAdapter,
    FakeClock,
    SequentialIdGen,
>;

/// Test context holding the executor, its fake adapters and the checkout root.
pub(crate) struct TestContext {
    pub executor: Arc<TestExecutor>,
    pub containers: FakeContainerAdapter,
    pub git: FakeGitAdapter,
    pub clock: FakeClock,
    pub checkouts: PathBuf,
    _dir: TempDir,
}

impl TestContext {
    pub fn logs(&self) -> &BuildLogs {
        self.executor.logs()
    }

    pub fn log_lines(&self, id: &str) -> Vec<String> {
        self.logs()
            .get(&BuildJobId::new(id))
            .into_iter()
            .map(|e| e.log)
            .collect()
    }

    /// Entries left in the checkout root
    pub fn leftover_checkouts(&self) -> Vec<String> {
        match std::fs::read_dir(&self.checkouts) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn serve_results(&self, files: &[(&str, &str)]) {
        self.containers
            .set_archive(crate::container::RESULTS_DIRECTORY, results_archive(files));
    }

    /// Wait until the build script has been started
    pub async fn script_started(&self) {
        let wait = async {
            while !self
                .containers
                .calls()
                .iter()
                .any(|c| matches!(c, ContainerCall::ExecStreaming { .. }))
            {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .unwrap();
    }
}

/// Executor over fresh fakes with a temporary checkout root.
pub(crate) fn setup() -> TestContext {
    let dir = tempfile::tempdir().unwrap();
    let checkouts = dir.path().join("checked-out-repos");
    let containers = FakeContainerAdapter::new();
    let git = FakeGitAdapter::new();
    let clock = FakeClock::default();
    let executor = BuildJobExecutor::new(
        ExecutorDeps {
            containers: containers.clone(),
            git: git.clone(),
            clock: clock.clone(),
            ids: SequentialIdGen::new("tok"),
        },
        ExecutorConfig::new(&checkouts),
    );
    TestContext {
        executor: Arc::new(executor),
        containers,
        git,
        clock,
        checkouts,
        _dir: dir,
    }
}

/// Tar archive as extracted from a container's results directory
pub(crate) fn results_archive(files: &[(&str, &str)]) -> Vec<u8> {
    tar_files(files.iter().map(|(path, content)| (*path, content.as_bytes()))).unwrap()
}

/// Processor for agent `agent-1` over an in-memory store sharing the context's clock.
pub(crate) fn processor(ctx: &TestContext, max_concurrent_builds: usize) -> (TestProcessor, TestStore) {
    let store = MemoryQueueStore::with_clock(ctx.clock.clone(), chrono::Duration::minutes(5));
    let mut config = ProcessorConfig::new(agent_identity("agent-1"));
    config.max_concurrent_builds = max_concurrent_builds;
    config.pause_grace_period = Duration::ZERO;
    let processor = QueueProcessor::new(store.clone(), Arc::clone(&ctx.executor), config);
    (processor, store)
}

/// Queued job whose assignment commit is unique to `id`, so concurrent
/// builds never share a checkout directory.
pub(crate) fn queued_job(id: &str) -> BuildJobQueueItem {
    let mut job = build_job(id);
    job.build_config.assignment_commit_hash = Some(format!("hash-{}", id));
    job
}

pub(crate) async fn wait_idle(processor: &TestProcessor) {
    tokio::time::timeout(Duration::from_secs(10), processor.wait_idle())
        .await
        .unwrap();
}
