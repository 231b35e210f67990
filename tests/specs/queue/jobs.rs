//! Queue inspection and job submission specs

use crate::prelude::*;
use lci_storage::QueueStore;

#[test]
fn enqueued_job_shows_in_queue() {
    let ws = Workspace::new();
    let job = ws.job("job-1");

    ws.lci()
        .args(&["enqueue", job.to_str().unwrap()])
        .passes()
        .stdout_eq("Queued build job job-1 (build job-1)\n");

    ws.lci()
        .args(&["queue"])
        .passes()
        .stdout_has("ID")
        .stdout_has("job-1")
        .stdout_has("queued");
}

#[test]
fn empty_queue_says_so() {
    let ws = Workspace::new();
    ws.lci()
        .args(&["queue"])
        .passes()
        .stdout_eq("No build jobs queued or running\n");
}

#[test]
fn queue_json_is_in_dequeue_order() {
    let ws = Workspace::new();
    let low = ws.job("low");
    let high = ws.job("high");
    ws.lci()
        .args(&["enqueue", low.to_str().unwrap(), "--priority", "5"])
        .passes();
    ws.lci()
        .args(&["enqueue", high.to_str().unwrap(), "--priority", "1"])
        .passes();

    let out = ws.lci().args(&["queue", "-o", "json"]).passes();
    let ids: Vec<String> = out
        .json()
        .as_array()
        .unwrap()
        .iter()
        .map(|job| job["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["high", "low"]);
}

#[test]
fn duplicate_job_id_is_rejected() {
    let ws = Workspace::new();
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();
    ws.lci()
        .args(&["enqueue", job.to_str().unwrap()])
        .fails()
        .stderr_has("build job job-1 is already queued or running");
}

#[test]
fn cancelling_a_queued_job_publishes_a_result() {
    let ws = Workspace::new();
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();

    ws.lci()
        .args(&["cancel", "job-1"])
        .passes()
        .stdout_eq("Removed queued build job job-1\n");

    ws.lci()
        .args(&["results"])
        .passes()
        .stdout_has("cancelled")
        .stdout_has("Build job with id job-1 was cancelled.");
    assert!(ws.store().queued_jobs().unwrap().is_empty());
}

#[test]
fn cancelling_an_unknown_job_fails() {
    let ws = Workspace::new();
    ws.lci()
        .args(&["cancel", "ghost"])
        .fails()
        .stderr_has("build job ghost is not queued or running");
}

#[test]
fn results_take_drains_the_result_queue() {
    let ws = Workspace::new();
    let job = ws.job("job-1");
    ws.lci().args(&["enqueue", job.to_str().unwrap()]).passes();
    ws.lci().args(&["cancel", "job-1", "-o", "json"]).passes();

    let taken = ws.lci().args(&["results", "--take", "-o", "json"]).passes();
    let results = taken.json();
    assert_eq!(results.as_array().unwrap().len(), 1);
    assert_eq!(results[0]["build_job"]["status"], "CANCELLED");

    ws.lci()
        .args(&["results"])
        .passes()
        .stdout_eq("No build results\n");
    assert!(ws.store().results().unwrap().is_empty());
}
