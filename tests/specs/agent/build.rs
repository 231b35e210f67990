//! End-to-end build specs: jobs submitted with the CLI are built by a queue
//! processor sharing the queue file, over fake container and git adapters.

use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;
use lci_adapters::container::archive::tar_files;
use lci_adapters::{FakeContainerAdapter, FakeGitAdapter};
use lci_core::{AgentIdentity, BuildStatus, SequentialIdGen, SystemClock};
use lci_engine::container::RESULTS_DIRECTORY;
use lci_engine::{BuildJobExecutor, ExecutorConfig, ExecutorDeps, ProcessorConfig, QueueProcessor};
use lci_storage::{FileQueueStore, QueueStore};

const PASSING_REPORT: &str = r#"<testsuite name="Tests"><testcase name="testAdd" classname="CalcTest"/><testcase name="testSub" classname="CalcTest"/></testsuite>"#;
const FAILING_REPORT: &str = r#"<testsuite name="Tests"><testcase name="testDiv" classname="CalcTest"><failure message="expected 2 but was 3"/></testcase></testsuite>"#;

type SpecProcessor =
    QueueProcessor<FileQueueStore, FakeContainerAdapter, FakeGitAdapter, SystemClock, SequentialIdGen>;

struct Agent {
    processor: SpecProcessor,
    containers: FakeContainerAdapter,
}

fn agent(ws: &Workspace) -> Agent {
    let containers = FakeContainerAdapter::new();
    let executor = BuildJobExecutor::new(
        ExecutorDeps {
            containers: containers.clone(),
            git: FakeGitAdapter::new(),
            clock: SystemClock,
            ids: SequentialIdGen::new("tok"),
        },
        ExecutorConfig::new(ws.path().join("checked-out-repos")),
    );
    let mut config = ProcessorConfig::new(AgentIdentity {
        name: "agent-1".to_string(),
        member_address: "agent-1/1".to_string(),
        display_name: "Agent One".to_string(),
    });
    config.pause_grace_period = Duration::ZERO;
    let processor = QueueProcessor::new(ws.store(), Arc::new(executor), config);
    Agent {
        processor,
        containers,
    }
}

fn serve(containers: &FakeContainerAdapter, files: &[(&str, &str)]) {
    let archive = tar_files(files.iter().map(|(path, body)| (*path, body.as_bytes()))).unwrap();
    containers.set_archive(RESULTS_DIRECTORY, archive);
}

async fn build_once(agent: &Agent) {
    agent.processor.tick().unwrap();
    tokio::time::timeout(Duration::from_secs(10), agent.processor.wait_idle())
        .await
        .unwrap();
}

#[tokio::test]
async fn submitted_job_is_built_and_published() {
    let ws = Workspace::new();
    let agent = agent(&ws);
    serve(&agent.containers, &[("results/TEST-Calc.xml", PASSING_REPORT)]);
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();

    build_once(&agent).await;

    ws.lci()
        .args(&["results"])
        .passes()
        .stdout_has("job-1")
        .stdout_has("successful")
        .stdout_has("2/2");
    ws.lci()
        .args(&["agents"])
        .passes()
        .stdout_has("agent-1")
        .stdout_has("Agent One")
        .stdout_has("idle")
        .stdout_has("0/1");
}

#[tokio::test]
async fn failing_tests_are_published_as_failed() {
    let ws = Workspace::new();
    let agent = agent(&ws);
    serve(
        &agent.containers,
        &[
            ("results/TEST-A.xml", PASSING_REPORT),
            ("results/TEST-B.xml", FAILING_REPORT),
        ],
    );
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();

    build_once(&agent).await;

    let out = ws.lci().args(&["results", "--take", "-o", "json"]).passes();
    let results = out.json();
    let item = &results[0];
    assert_eq!(item["build_job"]["status"], "FAILED");
    assert_eq!(item["build_result"]["successful"], false);
    assert!(ws.store().results().unwrap().is_empty());
}

#[tokio::test]
async fn paused_agent_leaves_jobs_queued() {
    let ws = Workspace::new();
    let agent = agent(&ws);
    agent.processor.heartbeat().unwrap();
    ws.lci()
        .args(&["pause", "agent-1"])
        .passes()
        .stdout_eq("Paused build agent agent-1\n");
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();

    agent.processor.tick().unwrap();

    assert!(agent.processor.is_paused());
    assert_eq!(ws.store().queued_jobs().unwrap().len(), 1);
    ws.lci().args(&["agents"]).passes().stdout_has("paused");

    ws.lci().args(&["resume", "agent-1"]).passes();
    serve(&agent.containers, &[("results/TEST-Calc.xml", PASSING_REPORT)]);
    build_once(&agent).await;

    let results = ws.store().results().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].build_job.status, BuildStatus::Successful);
}

#[tokio::test]
async fn cancel_request_stops_the_running_build() {
    let ws = Workspace::new();
    let agent = agent(&ws);
    agent.containers.hang_script();
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();
    agent.processor.tick().unwrap();
    assert_eq!(agent.processor.running_jobs().len(), 1);

    ws.lci()
        .args(&["cancel", "job-1"])
        .passes()
        .stdout_eq("Requested cancellation of running build job job-1\n");
    build_once(&agent).await;

    let results = ws.store().results().unwrap();
    assert_eq!(results[0].build_job.status, BuildStatus::Cancelled);
    assert!(ws.store().cancel_requests().unwrap().is_empty());
}

#[tokio::test]
async fn shutdown_hands_running_jobs_back() {
    let ws = Workspace::new();
    let agent = agent(&ws);
    agent.containers.hang_script();
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();
    agent.processor.tick().unwrap();

    agent.processor.shutdown().await.unwrap();

    let queued = ws.store().queued_jobs().unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].retry_count, 1);
    assert_eq!(queued[0].status, BuildStatus::Queued);
    ws.lci()
        .args(&["agents"])
        .passes()
        .stdout_eq("No build agents registered\n");
}
