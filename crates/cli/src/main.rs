// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lci - local CI queue operator CLI

mod color;
mod commands;
mod env;
mod output;
mod table;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lci_core::UuidIdGen;
use lci_storage::FileQueueStore;

use commands::{agent, job};
use output::OutputFormat;

/// Agent TTL used when reading the registry, matching the agent default.
const DEFAULT_AGENT_TTL_SECS: i64 = 60;

#[derive(Parser)]
#[command(name = "lci", version, about = "Local CI - build queue operator")]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    /// Queue file shared with the build agents [default: $LCI_QUEUE or <state dir>/queue.json]
    #[arg(long, global = true)]
    queue: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a build job from a TOML or JSON job file
    Enqueue {
        file: PathBuf,
        /// Override the job's priority (lower builds first)
        #[arg(long)]
        priority: Option<i32>,
    },
    /// Show queued and running build jobs
    Queue,
    /// Cancel a queued or running build job
    Cancel { id: String },
    /// Show published build results
    Results {
        /// Remove the results from the queue after printing them
        #[arg(long)]
        take: bool,
    },
    /// Show registered build agents
    Agents,
    /// Stop a build agent from taking new jobs
    Pause { agent: String },
    /// Let a paused build agent take jobs again
    Resume { agent: String },
}

fn main() {
    if let Err(e) = run() {
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(1);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, we skip
/// the "Caused by" chain. Otherwise we render the full chain.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

fn open_store(queue: Option<PathBuf>) -> Result<FileQueueStore> {
    let path = match queue {
        Some(path) => path,
        None => env::queue_path()?,
    };
    let ttl = env::agent_ttl_secs().unwrap_or(DEFAULT_AGENT_TTL_SECS);
    Ok(FileQueueStore::open(path, chrono::Duration::seconds(ttl))?)
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let store = open_store(cli.queue)?;
    match command {
        Commands::Enqueue { file, priority } => {
            job::handle_enqueue(&store, &file, priority, &UuidIdGen, format)
        }
        Commands::Queue => job::handle_queue(&store, format),
        Commands::Cancel { id } => job::handle_cancel(&store, &id, format),
        Commands::Results { take } => job::handle_results(&store, take, format),
        Commands::Agents => agent::handle_agents(&store, format),
        Commands::Pause { agent } => agent::handle_pause(&store, &agent, true, format),
        Commands::Resume { agent } => agent::handle_pause(&store, &agent, false, format),
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
