//! slayer deploys, initializes and tests the service layer contracts on Neo N3.

mod cli;
mod summary;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, DeployArgs, ExportArgs, NetworkArgs, TargetArgs};
use slayer_deploy::{
    DeploymentState, Deployer, Initializer, ProcessRunner, Settings, StateStore, catalogue,
    export_addresses, filter_artifacts,
    harness::{TestRunner, TestSummary},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every item succeeded. Skips are not failures.
async fn run(cli: Cli) -> Result<bool> {
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Command::Deploy(args) => deploy(&settings, args).await,
        Command::Init(args) => init(&settings, args).await,
        Command::Test(args) => test(&settings, args).await,
        Command::Status(args) => status(&settings, args),
        Command::Export(args) => export(&settings, args),
    }
}

async fn deploy(settings: &Settings, args: DeployArgs) -> Result<bool> {
    let profile = settings.resolve_profile(&args.target.network)?;
    let artifacts = filter_artifacts(
        catalogue(&settings.build_dir),
        args.target.filter.as_deref(),
    );

    tracing::info!(
        network = %profile.name(),
        build_dir = %settings.build_dir.display(),
        redeploy = args.redeploy,
        "Deploying {} contracts...",
        artifacts.len()
    );

    let runner = ProcessRunner;
    let report = Deployer::new(settings, &profile, &runner)
        .deploy_all(&artifacts, args.redeploy)
        .await
        .context("Deployment could not start")?;

    summary::print_deployment(&report);
    if let Some(aborted) = &report.aborted {
        tracing::error!(contract = %aborted.name, "Deployment aborted: {}", aborted.error);
        return Ok(false);
    }
    Ok(true)
}

async fn init(settings: &Settings, args: TargetArgs) -> Result<bool> {
    let profile = settings.resolve_profile(&args.network)?;
    let state = recorded_state(settings, &args.network)?;

    let runner = ProcessRunner;
    let report = Initializer::new(settings, &profile, &runner)
        .initialize(&state, args.filter.as_deref())
        .await?;

    summary::print_initialization(&report);
    Ok(!report.has_failures())
}

/// The persisted state of `network`. Fails if nothing was deployed there yet.
fn recorded_state(settings: &Settings, network: &str) -> Result<DeploymentState> {
    let profile = settings.resolve_profile(network)?;
    StateStore::for_network(&settings.state_dir, &profile)
        .load_existing()
        .context("Run `slayer deploy` for this network first")
}

fn status(settings: &Settings, args: NetworkArgs) -> Result<bool> {
    let state = recorded_state(settings, &args.network)?;
    summary::print_status(&state);
    Ok(true)
}

fn export(settings: &Settings, args: ExportArgs) -> Result<bool> {
    let state = recorded_state(settings, &args.target.network)?;
    let output = export_addresses(&state, args.format, chrono::Utc::now())
        .context("Failed to render addresses")?;
    println!("{output}");
    Ok(true)
}

async fn test(settings: &Settings, args: TargetArgs) -> Result<bool> {
    let profile = settings.resolve_profile(&args.network)?;

    let groups = TestRunner::new(&profile.rpc_url, &settings.build_dir)
        .filter(args.filter)
        .run()
        .await;

    summary::print_tests(&groups);
    Ok(TestSummary::from_groups(&groups).all_passed())
}
