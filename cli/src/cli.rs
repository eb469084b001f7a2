//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, OutputFlags};
use crate::commands;

/// Hotplug test harness for secondary network interfaces
#[derive(Parser)]
#[command(
    name = "eni-harness",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create, attach, and bring up the secondary interface
    Up,

    /// Bring down, detach, and delete the secondary interface
    Down,

    /// Show the secondary interface's lifecycle state
    Status,

    /// Run a full set-up, verify, tear-down session
    Check,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is missing or the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            no_color,
            quiet,
            json,
            command,
        } = self;
        let app = AppContext::new(&OutputFlags {
            no_color,
            quiet,
            json,
        })?;
        match command {
            Command::Up => commands::up::run(&app).await.map(|()| ExitCode::SUCCESS),
            Command::Down => commands::down::run(&app).await.map(|()| ExitCode::SUCCESS),
            Command::Status => commands::status::run(&app).await.map(|()| ExitCode::SUCCESS),
            Command::Check => commands::check::run(&app).await,
        }
    }
}
