//! Floor map migration CLI
//!
//! No flags: credentials come from the environment (or `.env`), the floor and
//! network are picked interactively.

use std::io::{self, BufReader};
use std::process::ExitCode;

use anyhow::Context;
use floormap_migrate::{
    logging, CatalystClient, MerakiClient, MigrateConfig, MigrateError, Migrator, Prompter,
};
use tracing::{error, info};

async fn migrate() -> Result<(), MigrateError> {
    let config = MigrateConfig::load().await?;

    let catalyst = CatalystClient::connect(&config.cat_center, &config.export).await?;
    let meraki = MerakiClient::new(&config.meraki)?;

    let prompter = Prompter::new(BufReader::new(io::stdin()), io::stdout());
    let mut migrator = Migrator::new(catalyst, meraki, prompter, config);
    let report = migrator.run().await?;

    info!(
        "Migration finished: {} assigned, {} failed, {} skipped",
        report.assigned.len(),
        report.failed.len(),
        report.skipped.len()
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // a missing .env is fine, the variables may already be exported
    let _ = dotenvy::dotenv();
    logging::init();

    info!("🗺️  Floor map migration starting...");

    match migrate().await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(MigrateError::Io(e)) => Err(e).context("console or filesystem I/O failed"),
        Err(e) => {
            error!("{}", e);
            eprintln!("❌ {e}");
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
