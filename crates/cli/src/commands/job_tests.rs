// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;
use lci_core::test_support::{agent_identity, build_job, epoch};
use lci_core::{BuildResult, FakeClock, RepositoryType, SequentialIdGen, TestCaseResult, TestJobResult};
use lci_storage::MemoryQueueStore;

const JOB_TOML: &str = r#"
name = "prog-student1 push"
priority = 1
course_id = 7

[repository_info]
triggered_by_push_to = "ASSIGNMENT"
assignment_repository_uri = "https://artemis.test/git/PROG/prog-student1.git"
test_repository_uri = "https://artemis.test/git/PROG/prog-tests.git"

[build_config]
docker_image = "ls1tum/artemis-maven-template:java17-20"
build_script = "./gradlew clean test"
branch = "main"
result_paths = ["build/test-results/test/*.xml"]
"#;

fn store() -> MemoryQueueStore<FakeClock> {
    MemoryQueueStore::with_clock(FakeClock::new(epoch()), Duration::seconds(60))
}

fn write_job(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn toml_job_file_becomes_a_queued_item() {
    let dir = tempfile::tempdir().unwrap();
    let file = JobFile::load(&write_job(&dir, "job.toml", JOB_TOML)).unwrap();
    let job = file.into_queue_item(&SequentialIdGen::new("job"), epoch());

    assert_eq!(job.id, "job-1");
    assert_eq!(job.status, BuildStatus::Queued);
    assert_eq!(job.priority, 1);
    assert_eq!(job.course_id, 7);
    assert_eq!(job.retry_count, 0);
    assert_eq!(job.timing.submission_date, epoch());
    assert_eq!(job.repository_info.triggered_by_push_to, RepositoryType::Assignment);
    assert_eq!(job.repository_info.test_repository_uri.slug(), "prog-tests");
    assert_eq!(job.build_config.assignment_commit_hash, None);
}

#[test]
fn json_job_file_with_explicit_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut value: serde_json::Value = serde_json::to_value(&build_job("x")).unwrap();
    let fields = value.as_object_mut().unwrap();
    for key in ["build_agent", "retry_count", "status", "timing"] {
        fields.remove(key);
    }
    fields.insert("id".into(), "manual-42".into());
    let path = write_job(&dir, "job.json", &value.to_string());

    let job = JobFile::load(&path)
        .unwrap()
        .into_queue_item(&SequentialIdGen::new("job"), epoch());
    assert_eq!(job.id, "manual-42");
    assert_eq!(job.name, "build x");
}

#[test]
fn blank_id_is_generated() {
    let dir = tempfile::tempdir().unwrap();
    let content = format!("id = \" \"\n{JOB_TOML}");
    let job = JobFile::load(&write_job(&dir, "job.toml", &content))
        .unwrap()
        .into_queue_item(&SequentialIdGen::new("gen"), epoch());
    assert_eq!(job.id, "gen-1");
}

#[test]
fn unknown_fields_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let content = format!("colour = \"blue\"\n{JOB_TOML}");
    let err = JobFile::load(&write_job(&dir, "job.toml", &content)).unwrap_err();
    assert!(format!("{err:#}").contains("job.toml"), "{err:#}");
}

#[test]
fn missing_job_file_names_the_path() {
    let err = JobFile::load(Path::new("/nonexistent/job.toml")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/job.toml"));
}

#[test]
fn enqueue_applies_priority_override_and_rejects_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = store();
    let content = format!("id = \"fixed\"\n{JOB_TOML}");
    let file = JobFile::load(&write_job(&dir, "job.toml", &content)).unwrap();
    let ids = SequentialIdGen::new("job");

    let job = enqueue(&store, file.clone(), Some(0), &ids).unwrap();
    assert_eq!(job.priority, 0);
    assert_eq!(store.queued_jobs().unwrap(), vec![job]);

    let err = enqueue(&store, file, None, &ids).unwrap_err();
    assert!(err.to_string().contains("already queued"), "{err}");
}

#[test]
fn active_jobs_lists_queued_before_running() {
    let store = store();
    let mut low = build_job("low");
    low.priority = 5;
    store.enqueue(low).unwrap();
    store.enqueue(build_job("high")).unwrap();
    let running = build_job("run")
        .assigned_to(agent_identity("agent-1"), epoch())
        .unwrap();
    store.mark_processing(running).unwrap();

    let ids: Vec<String> = active_jobs(&store)
        .unwrap()
        .into_iter()
        .map(|job| job.id.to_string())
        .collect();
    assert_eq!(ids, vec!["high", "low", "run"]);
}

#[test]
fn cancel_queued_job_publishes_cancelled_result() {
    let store = store();
    store.enqueue(build_job("job-1")).unwrap();

    assert_eq!(cancel(&store, "job-1").unwrap(), CancelOutcome::Dequeued);
    assert!(store.queued_jobs().unwrap().is_empty());
    let results = store.results().unwrap();
    assert_eq!(results[0].build_job.status, BuildStatus::Cancelled);
}

#[test]
fn cancel_running_job_leaves_a_request() {
    let store = store();
    let running = build_job("job-1")
        .assigned_to(agent_identity("agent-1"), epoch())
        .unwrap();
    store.mark_processing(running).unwrap();

    assert_eq!(cancel(&store, "job-1").unwrap(), CancelOutcome::Requested);
    assert_eq!(store.cancel_requests().unwrap(), vec![BuildJobId::new("job-1")]);
}

#[test]
fn cancel_unknown_job_fails() {
    let err = cancel(&store(), "ghost").unwrap_err();
    assert_eq!(err.to_string(), "build job ghost is not queued or running");
}

#[test]
fn test_summary_counts_passed_of_total() {
    let passed = TestCaseResult::new("ok", None, Vec::new());
    let failed = TestCaseResult::new("broken", None, vec!["expected 1".into()]);
    let result = BuildResult::new(
        "main",
        None,
        None,
        epoch(),
        vec![TestJobResult {
            failed_tests: vec![failed],
            successful_tests: vec![passed.clone(), passed],
        }],
        Vec::new(),
        Vec::new(),
    );
    let job = build_job("job-1");
    let item = ResultQueueItem {
        build_result: Some(result),
        build_job: job.clone(),
        build_logs: Vec::new(),
        error: None,
    };
    assert_eq!(test_summary(&item), "2/3");

    let errored = ResultQueueItem {
        build_result: None,
        build_job: job,
        build_logs: Vec::new(),
        error: Some("pull failed".into()),
    };
    assert_eq!(test_summary(&errored), "-");
}
