//! Agent registry specs

use crate::prelude::*;
use lci_core::test_support::agent_info;
use lci_storage::QueueStore;

#[test]
fn registered_agents_are_listed() {
    let ws = Workspace::new();
    let store = ws.store();
    store.update_agent_info(agent_info("ci-2", store.now())).unwrap();
    store.update_agent_info(agent_info("ci-1", store.now())).unwrap();

    let out = ws.lci().args(&["agents"]).passes();
    let stdout = out.stdout();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3, "{stdout}");
    assert!(lines[0].starts_with("NAME"));
    assert!(lines[1].starts_with("ci-1"));
    assert!(lines[2].starts_with("ci-2"));
    assert!(lines[1].contains("0/2"));
}

#[test]
fn silent_agents_are_evicted() {
    let ws = Workspace::new();
    let store = ws.store();
    let stale = store.now() - chrono::Duration::minutes(10);
    store.update_agent_info(agent_info("ci-1", stale)).unwrap();

    ws.lci()
        .args(&["agents"])
        .passes()
        .stdout_eq("No build agents registered\n");
}

#[test]
fn pause_flag_round_trips_through_json() {
    let ws = Workspace::new();
    let store = ws.store();
    store.update_agent_info(agent_info("ci-1", store.now())).unwrap();

    let out = ws.lci().args(&["pause", "ci-1", "-o", "json"]).passes();
    let report = out.json();
    assert_eq!(report["agent"], "ci-1");
    assert_eq!(report["paused"], true);
    assert_eq!(report["registered"], true);
    assert!(store.is_paused("ci-1").unwrap());

    let agents = ws.lci().args(&["agents", "-o", "json"]).passes().json();
    assert_eq!(agents[0]["status"], "PAUSED");

    ws.lci()
        .args(&["resume", "ci-1"])
        .passes()
        .stdout_eq("Resumed build agent ci-1\n");
    assert!(!store.is_paused("ci-1").unwrap());
}

#[test]
fn pausing_an_absent_agent_is_noted() {
    let ws = Workspace::new();
    ws.lci()
        .args(&["pause", "ci-9"])
        .passes()
        .stdout_eq("Paused build agent ci-9 (not currently registered)\n");
}
