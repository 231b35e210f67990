// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local CI build agent (lci-agent)
//!
//! Long-running process that takes build jobs from the shared queue, runs
//! them in containers and publishes their results.

use std::path::PathBuf;

use lci_agent::{env, lifecycle, AgentConfig, AgentPaths, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Startup marker prefix written to the log before anything else.
/// Full format: "--- lci-agent: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- lci-agent: starting (pid: ";

fn print_help() {
    println!("lci-agent {}", env!("CARGO_PKG_VERSION"));
    println!("Local CI build agent - runs queued build jobs in containers");
    println!();
    println!("USAGE:");
    println!("    lci-agent [--config <path>]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <path>  Agent config file (default: $LCI_CONFIG or <state dir>/agent.toml)");
    println!("    -h, --help           Print help information");
    println!("    -v, --version        Print version information");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config_path = env::config_path();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("lci-agent {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            "--config" | "-c" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: --config requires a path");
                    std::process::exit(1);
                }
            },
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: lci-agent [--config <path>] [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let state_dir = env::state_dir()?;
    let config = AgentConfig::load(config_path.as_deref(), &state_dir)?;
    let paths = config.paths(&state_dir);

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&paths)?;
    let log_guard = setup_logging(&paths)?;

    info!(agent = config.short_name.as_str(), "starting build agent");

    let agent = match lifecycle::startup(&config, &paths).await {
        Ok(agent) => agent,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&paths, &e);
            error!("Failed to start agent: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };
    if let Some(key) = &agent.key {
        println!("{}", key.public_key());
    }
    println!("READY");

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
    };

    agent.run(shutdown).await?;
    drop(log_guard);
    Ok(())
}

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(paths: &AgentPaths) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = paths.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(paths: &AgentPaths, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start agent: {}", error);
}

fn setup_logging(
    paths: &AgentPaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = paths
        .log_path
        .parent()
        .unwrap_or_else(|| std::path::Path::new("."));
    std::fs::create_dir_all(log_dir)?;

    let file_name = paths
        .log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "agent.log".into());
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
