//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// testfleet - bounded-concurrency launcher for browser test jobs
#[derive(Parser)]
#[command(
    name = "tf",
    about = "Launch browser test jobs as OS processes under a concurrency cap",
    version,
    after_help = "Logs are written to: ~/.local/share/testfleet/logs/testfleet.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Launch test jobs under the concurrency cap
    Run {
        /// Job names to run, in order
        #[arg(value_name = "JOB")]
        jobs: Vec<String>,

        /// File with one job name per line
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Concurrency cap (platform default when omitted)
        #[arg(long)]
        cap: Option<usize>,
    },

    /// Poll the device cloud until no remote job is still in progress
    WaitRemote {
        /// Number of remote jobs to watch
        #[arg(value_name = "TOTAL")]
        total: usize,
    },

    /// List the jobs that would run
    Jobs {
        /// File with one job name per line
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Path of the log file tracing output is written to
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("testfleet")
        .join("logs")
        .join("testfleet.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["tf"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::parse_from(["tf", "run", "login", "checkout"]);
        if let Some(Command::Run { jobs, file, cap }) = cli.command {
            assert_eq!(jobs, vec!["login", "checkout"]);
            assert!(file.is_none());
            assert!(cap.is_none());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_with_cap() {
        let cli = Cli::parse_from(["tf", "run", "--cap", "3", "login"]);
        if let Some(Command::Run { cap, .. }) = cli.command {
            assert_eq!(cap, Some(3));
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_wait_remote() {
        let cli = Cli::parse_from(["tf", "wait-remote", "12"]);
        assert!(matches!(cli.command, Some(Command::WaitRemote { total: 12 })));
    }

    #[test]
    fn test_cli_parse_jobs_with_file() {
        let cli = Cli::parse_from(["tf", "jobs", "--file", "suite.txt"]);
        if let Some(Command::Jobs { file }) = cli.command {
            assert_eq!(file, Some(PathBuf::from("suite.txt")));
        } else {
            panic!("Expected Jobs command");
        }
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["tf", "-c", "/path/to/config.yml", "jobs"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
    }
}
