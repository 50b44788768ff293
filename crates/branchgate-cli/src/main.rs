//! Branchgate CLI
//!
//! The `branchgate` command starts TeamCity builds for branches waiting at a
//! Jira gate and moves the matching issues once a build has been checked.
//!
//! ## Invocation
//!
//! Parameters are `key=value` tokens:
//!
//! - `type=build|unit|smoke`: which pass to run
//! - `on=<instance>`: build server builds are started on
//! - `buildtype=<id>`: build configuration to start
//! - `branch=<ref>`, `domain=<ref>`: branch and environment domain
//! - `checkon=<instance>`, `checkbuildid=<id>`: build to check (unit/smoke)
//! - `jira=true|false`: whether a check may move issues
//! - `notstartbuilds=<type,...>`: operation types that must not start builds

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;

use branchgate_core::{Invocation, Orchestrator, RunReport};
use config::{Settings, DEFAULT_TRACKER};
use jira_client::JiraClient;
use teamcity_client::TeamCityClient;

#[derive(Parser)]
#[command(name = "branchgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Branch build orchestration for TeamCity with Jira status sync",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Settings file
    #[arg(short, long, env = "BRANCHGATE_CONFIG", default_value = "branchgate.toml")]
    config: PathBuf,

    /// Invocation parameters, e.g. `type=build on=dev buildtype=Dev_Deploy`
    #[arg(value_name = "KEY=VALUE", required = true)]
    params: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    branchgate_core::init_tracing(cli.json, level);

    match run(&cli).await {
        Ok(report) => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let invocation = Invocation::parse(&cli.params)?;
    let settings = Settings::load(&cli.config)?;

    let tracker_settings = settings.tracker(DEFAULT_TRACKER)?.require("tracker")?;
    let primary_settings = settings
        .build_server(&invocation.on)?
        .require("build server")?;

    let tracker = JiraClient::new(tracker_settings.jira_config()?)
        .context("Failed to create Jira client")?;
    let primary = TeamCityClient::new(primary_settings.teamcity_config()?)
        .context("Failed to create TeamCity client")?;

    let mut orchestrator = Orchestrator::new(
        Arc::new(tracker),
        Arc::new(primary),
        settings.orchestrator_settings(tracker_settings, primary_settings),
    );

    if let Some(check_on) = &invocation.check_on {
        let check_settings = settings.build_server(check_on)?.require("build server")?;
        let check = TeamCityClient::new(check_settings.teamcity_config()?)
            .context("Failed to create TeamCity client")?;
        orchestrator = orchestrator.with_check_server(Arc::new(check));
    }

    Ok(orchestrator.run(&invocation).await?)
}

fn print_report(report: &RunReport) {
    if let Some(reason) = &report.failure_reason {
        println!("Checked build failed: {}", reason);
    }
    if !report.eligible.is_empty() {
        println!("Eligible branches: {}", report.eligible.join(", "));
    }
    println!("Builds enqueued: {}", report.enqueued);
    if let Some(sync) = &report.sync {
        println!("Issues moved:");
        println!("  test (fixed):         {}", sync.test_fixed);
        println!("  release (fixed):      {}", sync.release_fixed);
        println!("  test (unresolved):    {}", sync.test_unresolved);
        println!("  release (unresolved): {}", sync.release_unresolved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tokens_are_collected_in_order() {
        let cli = Cli::try_parse_from([
            "branchgate",
            "--config",
            "/etc/branchgate.toml",
            "type=build",
            "on=dev",
            "buildtype=Dev_Deploy",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("/etc/branchgate.toml"));
        assert_eq!(cli.params, vec!["type=build", "on=dev", "buildtype=Dev_Deploy"]);
    }

    #[test]
    fn test_tokens_are_required() {
        assert!(Cli::try_parse_from(["branchgate"]).is_err());
    }
}
