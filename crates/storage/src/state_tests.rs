// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lci_core::test_support::{agent_identity, agent_info, build_job, epoch};

fn ids(jobs: &[BuildJobQueueItem]) -> Vec<&str> {
    jobs.iter().map(|j| j.id.as_str()).collect()
}

fn running(id: &str, agent: &str) -> BuildJobQueueItem {
    build_job(id).assigned_to(agent_identity(agent), epoch()).unwrap()
}

fn result_for(job: BuildJobQueueItem) -> ResultQueueItem {
    ResultQueueItem {
        build_result: None,
        build_job: job.completed(BuildStatus::Failed, epoch()).unwrap(),
        build_logs: Vec::new(),
        error: None,
    }
}

// ── Queue ordering ───────────────────────────────────────────────────────────

#[test]
fn dequeue_orders_by_priority_then_submission_then_insertion() {
    let mut state = QueueState::default();
    let mut low = build_job("low");
    low.priority = 5;
    let mut early = build_job("early");
    early.timing.submission_date = epoch() - Duration::seconds(30);
    let first = build_job("first");
    let second = build_job("second");
    let mut urgent = build_job("urgent");
    urgent.priority = 1;

    for job in [low, first, second, early, urgent] {
        state.enqueue(job).unwrap();
    }

    let order: Vec<_> = std::iter::from_fn(|| state.dequeue()).collect();
    assert_eq!(ids(&order), vec!["urgent", "early", "first", "second", "low"]);
}

#[test]
fn claim_moves_next_job_into_processing() {
    let mut state = QueueState::default();
    state.enqueue(build_job("job-1")).unwrap();

    let claimed = state.claim_next(agent_identity("agent-a"), epoch()).unwrap().unwrap();

    assert_eq!(claimed.status, BuildStatus::Running);
    assert_eq!(claimed.build_agent, Some(agent_identity("agent-a")));
    assert!(state.queued.is_empty());
    assert_eq!(state.processing.get("job-1"), Some(&claimed));
}

#[test]
fn unassignable_job_stays_queued_in_place() {
    let mut state = QueueState::default();
    let mut stuck = build_job("stuck");
    stuck.priority = 1;
    stuck.status = BuildStatus::Cancelled;
    state.enqueue(build_job("job-1")).unwrap();
    state.enqueue(stuck).unwrap();

    let err = state.claim_next(agent_identity("agent-a"), epoch()).unwrap_err();

    assert!(matches!(err, StoreError::Transition(_)));
    assert_eq!(ids(&state.queued), vec!["job-1", "stuck"]);
    assert!(state.processing.is_empty());
}

#[test]
fn claim_on_empty_queue_is_none() {
    let mut state = QueueState::default();
    assert!(state.claim_next(agent_identity("agent-a"), epoch()).unwrap().is_none());
}

#[test]
fn dequeue_on_empty_queue_is_none() {
    assert!(QueueState::default().dequeue().is_none());
}

#[test]
fn enqueue_rejects_queued_or_running_duplicates() {
    let mut state = QueueState::default();
    state.enqueue(build_job("job-1")).unwrap();
    assert!(matches!(state.enqueue(build_job("job-1")), Err(StoreError::DuplicateJob(_))));

    state.start_processing(running("job-2", "agent-a"));
    assert!(matches!(state.enqueue(build_job("job-2")), Err(StoreError::DuplicateJob(_))));
}

// ── Processing and results ───────────────────────────────────────────────────

#[test]
fn finish_moves_job_to_results() {
    let mut state = QueueState::default();
    let job = running("job-1", "agent-a");
    state.start_processing(job.clone());
    state.cancel_requests.insert("job-1".into());

    state.finish(result_for(job));

    assert!(state.processing.is_empty());
    assert!(state.cancel_requests.is_empty());
    assert_eq!(state.results.len(), 1);
    assert_eq!(state.take_results().len(), 1);
    assert!(state.results.is_empty());
}

#[test]
fn finish_drops_redelivered_copy_from_queue() {
    let mut state = QueueState::default();
    let job = running("job-1", "agent-a");
    state.queued.push(job.requeued());

    state.finish(result_for(job));
    assert!(state.queued.is_empty());
}

#[test]
fn requeue_returns_job_with_bumped_retry_count() {
    let mut state = QueueState::default();
    state.start_processing(running("job-1", "agent-a"));

    assert!(state.requeue(&BuildJobId::new("job-1"), epoch()));

    assert!(state.processing.is_empty());
    let job = state.dequeue().unwrap();
    assert_eq!(job.status, BuildStatus::Queued);
    assert_eq!(job.retry_count, 1);
    assert!(job.build_agent.is_none());
}

#[test]
fn requeue_gives_up_after_max_retries() {
    let mut state = QueueState::default();
    let mut job = running("job-1", "agent-a");
    job.retry_count = MAX_RETRIES;
    state.start_processing(job);

    assert!(state.requeue(&BuildJobId::new("job-1"), epoch()));

    assert!(state.queued.is_empty());
    let result = state.results.pop_front().unwrap();
    assert_eq!(result.build_job.status, BuildStatus::Failed);
    assert!(result.error.is_some());
}

#[test]
fn requeue_of_unknown_job_is_false() {
    assert!(!QueueState::default().requeue(&BuildJobId::new("nope"), epoch()));
}

// ── Agent registry ───────────────────────────────────────────────────────────

#[test]
fn stale_agents_are_evicted_and_their_jobs_requeued() {
    let mut state = QueueState::default();
    state.upsert_agent(agent_info("agent-a", epoch()));
    state.upsert_agent(agent_info("agent-b", epoch() + Duration::seconds(50)));
    state.start_processing(running("job-a", "agent-a"));
    state.start_processing(running("job-b", "agent-b"));

    let evicted = state.evict_stale_agents(epoch() + Duration::seconds(61), Duration::seconds(60));

    assert_eq!(evicted, vec!["agent-a".to_string()]);
    assert!(state.agents.contains_key("agent-b"));
    assert_eq!(ids(&state.queued), vec!["job-a"]);
    assert!(state.processing.contains_key("job-b"));
}

#[yare::parameterized(
    fresh         = { 10, false },
    exactly_ttl   = { 60, false },
    past_ttl      = { 61, true },
)]
fn eviction_threshold(age_secs: i64, evicted: bool) {
    let mut state = QueueState::default();
    state.upsert_agent(agent_info("agent-a", epoch()));
    let removed = state.evict_stale_agents(epoch() + Duration::seconds(age_secs), Duration::seconds(60));
    assert_eq!(!removed.is_empty(), evicted);
}

#[test]
fn upsert_replaces_by_short_name() {
    let mut state = QueueState::default();
    state.upsert_agent(agent_info("agent-a", epoch()));
    let mut updated = agent_info("agent-a", epoch() + Duration::seconds(5));
    updated.max_concurrent_builds = 8;
    state.upsert_agent(updated);

    assert_eq!(state.agents.len(), 1);
    assert_eq!(state.agents["agent-a"].max_concurrent_builds, 8);
    assert!(state.remove_agent("agent-a").is_some());
    assert!(state.remove_agent("agent-a").is_none());
}

// ── Cancellation and pausing ─────────────────────────────────────────────────

#[test]
fn cancelling_queued_job_records_cancelled_result() {
    let mut state = QueueState::default();
    state.enqueue(build_job("job-1")).unwrap();

    let outcome = state.request_cancel(&BuildJobId::new("job-1"), epoch());

    assert_eq!(outcome, CancelOutcome::Dequeued);
    assert!(state.queued.is_empty());
    let result = &state.results[0];
    assert_eq!(result.build_job.status, BuildStatus::Cancelled);
    assert_eq!(result.build_job.timing.build_completion_date, Some(epoch()));
}

#[test]
fn cancelling_running_job_leaves_a_request() {
    let mut state = QueueState::default();
    state.start_processing(running("job-1", "agent-a"));

    let outcome = state.request_cancel(&BuildJobId::new("job-1"), epoch());

    assert_eq!(outcome, CancelOutcome::Requested);
    assert!(state.cancel_requests.contains("job-1"));
    assert!(state.results.is_empty());
}

#[test]
fn cancelling_unknown_job_is_not_found() {
    let outcome = QueueState::default().request_cancel(&BuildJobId::new("job-9"), epoch());
    assert_eq!(outcome, CancelOutcome::NotFound);
}

#[test]
fn pause_flags_toggle() {
    let mut state = QueueState::default();
    state.set_paused("agent-a", true);
    assert!(state.paused_agents.contains("agent-a"));
    state.set_paused("agent-a", false);
    assert!(state.paused_agents.is_empty());
}

#[test]
fn state_survives_json_round_trip() {
    let mut state = QueueState::default();
    state.enqueue(build_job("job-1")).unwrap();
    state.start_processing(running("job-2", "agent-a"));
    state.upsert_agent(agent_info("agent-a", epoch()));

    let json = serde_json::to_string(&state).unwrap();
    let restored: QueueState = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, state);
}

#[test]
fn missing_fields_default_to_empty() {
    let state: QueueState = serde_json::from_str("{}").unwrap();
    assert_eq!(state, QueueState::default());
}
