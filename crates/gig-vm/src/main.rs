mod config;
mod error;
mod output;

use std::process::ExitCode;

use clap::Parser;
use g8_api::G8Client;
use g8_vm::{ReconciliationResult, Reconciler};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Cli};
use crate::error::CliError;
use crate::output::FailureResponse;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries the result document
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(result) => {
            print_json(&result);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "reconciliation failed");
            print_json(&FailureResponse::from_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ReconciliationResult, CliError> {
    let config = AppConfig::load(cli)?;
    let desired = &config.desired;

    let client = G8Client::new(&config.api_url, &config.jwt);
    let reconciler = Reconciler::new(&client).with_poll_policy(config.poll);

    tracing::info!(
        api_url = %client.api_url(),
        customer = %desired.customer_id,
        cloudspace = %desired.cloudspace_id,
        state = %desired.state,
        check_mode = config.check_mode,
        "reconciling vm"
    );

    let plan = reconciler.plan(desired).await?;
    if config.check_mode {
        return Ok(plan.preview());
    }

    Ok(reconciler.apply(desired, plan).await?)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "failed to serialize output"),
    }
}
