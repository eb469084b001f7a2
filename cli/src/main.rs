//! eni-harness: hotplug test harness for secondary network interfaces

use std::process::ExitCode;

use clap::Parser;
use eni_harness::cli::Cli;
use eni_harness::output::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let as_json = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            match json::format_error(&format!("{e:#}"), json::error_code(&e)) {
                Ok(body) if as_json => println!("{body}"),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
