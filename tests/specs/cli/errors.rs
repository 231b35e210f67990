//! CLI error handling specs

use crate::prelude::*;

#[test]
fn missing_job_file_is_reported() {
    let ws = Workspace::new();
    ws.lci()
        .args(&["enqueue", "does-not-exist.toml"])
        .fails()
        .stderr_has("Error: failed to read job file does-not-exist.toml");
}

#[test]
fn malformed_job_file_is_reported() {
    let ws = Workspace::new();
    let path = ws.file("broken.toml", "name = \"x\"\n");
    ws.lci()
        .args(&["enqueue", path.to_str().unwrap()])
        .fails()
        .stderr_has("invalid job file")
        .stderr_has("repository_info");
}

#[test]
fn unknown_subcommand_fails() {
    cli().args(&["launch"]).fails().stderr_has("unrecognized subcommand");
}

#[test]
fn invalid_agent_name_is_rejected() {
    let ws = Workspace::new();
    ws.lci()
        .args(&["pause", "Build Box"])
        .fails()
        .stderr_has("may only contain lowercase letters");
}
