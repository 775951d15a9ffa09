use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use tracing::{error, info};

use clockify_weekly_report::{service, RunOutcome, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = Settings::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    info!("Starting weekly report run");

    let result = service::run(settings, Utc::now())
        .await
        .context("weekly report run failed");

    match result {
        Ok(RunOutcome::NothingToBill) => {
            info!("Nothing to bill this week, no email sent");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Sent { amount }) => {
            info!("Weekly report sent for {}", amount);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
