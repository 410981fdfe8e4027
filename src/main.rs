//! testfleet - bounded-concurrency launcher for browser test jobs
//!
//! CLI entry point for launching local jobs and watching remote ones.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use testfleet::census::{ProcessCensus, PsCensus};
use testfleet::cli::{Cli, Command, get_log_path};
use testfleet::config::Config;
use testfleet::launcher::{Launcher, ShellSpawner};
use testfleet::remote::{HttpRemoteClient, StatusPoller};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Run { jobs, file, cap }) => cmd_run(&config, &jobs, file.as_deref(), cap).await,
        Some(Command::WaitRemote { total }) => cmd_wait_remote(&config, total).await,
        Some(Command::Jobs { file }) => cmd_jobs(&config, file.as_deref()),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Launch the resolved job list under the concurrency cap
async fn cmd_run(config: &Config, positional: &[String], file: Option<&Path>, cap: Option<usize>) -> Result<()> {
    let job_ids = testfleet::jobs::resolve(positional, file, config)?;

    let mut launcher_config = config.launcher.clone();
    if cap.is_some() {
        launcher_config.cap = cap;
    }

    println!(
        "Launching {} jobs (cap: {}, logs: {})",
        job_ids.len(),
        launcher_config.resolved_cap(),
        launcher_config.log_dir.display()
    );

    let spawner = Arc::new(ShellSpawner::new(
        launcher_config.worker_command.clone(),
        launcher_config.log_dir.clone(),
    ));
    let census = Arc::new(PsCensus::new(launcher_config.census_signature()));

    // Fail fast: without the census there is no admission control
    census
        .count()
        .await
        .context("Process census unavailable; aborting before any job starts")?;

    let mut launcher = Launcher::new(launcher_config, job_ids, spawner, census);
    let summary = launcher.run().await?;

    info!(total = summary.total, "Run finished");
    Ok(())
}

/// Poll the device cloud until no remote job is still in progress
async fn cmd_wait_remote(config: &Config, total: usize) -> Result<()> {
    config.validate_remote()?;

    let client = HttpRemoteClient::from_config(&config.remote).context("Failed to create remote client")?;
    let poller = StatusPoller::new(Arc::new(client), config.remote.poll_interval());

    println!("Waiting for {} remote jobs to finish...", total);
    poller.wait_all_done(total).await;
    println!("All remote jobs reached a terminal status");

    Ok(())
}

/// List the jobs that would run
fn cmd_jobs(config: &Config, file: Option<&Path>) -> Result<()> {
    let job_ids = testfleet::jobs::resolve(&[], file, config)?;

    println!("{} jobs:", job_ids.len());
    for id in &job_ids {
        println!("  {}", id);
    }

    Ok(())
}
