//! CLI help specs

use crate::prelude::*;

#[test]
fn no_subcommand_prints_help() {
    cli()
        .passes()
        .stdout_has("Usage: lci")
        .stdout_has("enqueue")
        .stdout_has("agents");
}

#[test]
fn help_lists_every_command() {
    let out = cli().args(&["--help"]).passes();
    for command in ["enqueue", "queue", "cancel", "results", "agents", "pause", "resume"] {
        assert!(out.stdout().contains(command), "missing {command}:\n{}", out.stdout());
    }
}

#[test]
fn version_flag_prints_version() {
    cli().args(&["--version"]).passes().stdout_has("lci ");
}
