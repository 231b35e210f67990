// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build agent command handlers

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use lci_core::{validate_short_name, BuildAgentInformation, BuildAgentStatus};
use lci_storage::QueueStore;

use crate::output::{format_time_ago, print_json, OutputFormat};
use crate::table::{Column, Table};

/// Registered agents by name. A pause request the agent has not yet
/// acknowledged in a heartbeat is reported as paused.
pub fn list_agents(store: &impl QueueStore) -> Result<Vec<BuildAgentInformation>> {
    let mut agents = store.agents()?;
    for agent in &mut agents {
        if store.is_paused(&agent.build_agent.name)? {
            agent.status = BuildAgentStatus::Paused;
        }
    }
    agents.sort_by(|a, b| a.build_agent.name.cmp(&b.build_agent.name));
    Ok(agents)
}

pub fn handle_agents(store: &impl QueueStore, format: OutputFormat) -> Result<()> {
    let agents = list_agents(store)?;
    match format {
        OutputFormat::Json => print_json(&agents)?,
        OutputFormat::Text if agents.is_empty() => println!("No build agents registered"),
        OutputFormat::Text => agent_table(&agents, store.now()).print(),
    }
    Ok(())
}

fn agent_table(agents: &[BuildAgentInformation], now: DateTime<Utc>) -> Table {
    let mut table = Table::new(vec![
        Column::left("NAME"),
        Column::left("DISPLAY NAME").with_max(30),
        Column::status("STATUS"),
        Column::right("SLOTS"),
        Column::right("RECENT"),
        Column::left("HEARTBEAT"),
        Column::muted("ADDRESS"),
    ]);
    for agent in agents {
        table.row(vec![
            agent.build_agent.name.clone(),
            agent.build_agent.display_name.clone(),
            agent.status.to_string(),
            format!(
                "{}/{}",
                agent.running_build_jobs.len(),
                agent.max_concurrent_builds
            ),
            agent.recent_build_jobs.len().to_string(),
            format_time_ago(agent.last_heartbeat, now),
            agent.build_agent.member_address.clone(),
        ]);
    }
    table
}

#[derive(Debug, Serialize)]
struct PauseReport<'a> {
    agent: &'a str,
    paused: bool,
    registered: bool,
}

/// Set or clear the pause flag of `agent`; returns whether the agent is
/// currently registered. Unregistered agents pick the flag up when they join.
pub fn set_paused(store: &impl QueueStore, agent: &str, paused: bool) -> Result<bool> {
    validate_short_name(agent)?;
    store.set_paused(agent, paused)?;
    let registered = store
        .agents()?
        .iter()
        .any(|info| info.build_agent.name == agent);
    Ok(registered)
}

pub fn handle_pause(
    store: &impl QueueStore,
    agent: &str,
    paused: bool,
    format: OutputFormat,
) -> Result<()> {
    let registered = set_paused(store, agent, paused)?;
    match format {
        OutputFormat::Json => print_json(&PauseReport {
            agent,
            paused,
            registered,
        })?,
        OutputFormat::Text => {
            let verb = if paused { "Paused" } else { "Resumed" };
            if registered {
                println!("{verb} build agent {agent}");
            } else {
                println!("{verb} build agent {agent} (not currently registered)");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
