//! Data file replacement runner
//!
//! Seeds the in-memory stores from a JSON state fixture, prints the
//! replacement plan for the configured pair of files and, when asked to,
//! performs the replacement and writes the resulting state back out.

use anyhow::Context;
use datafile_replacement::config::{LogFormat, Settings};
use datafile_replacement::store::{
    ContentStore, InMemoryDataSetVersions, StatisticsStore, StoreFileRemover, StoreSnapshot,
};
use datafile_replacement::{ReplacementError, ReplacementService};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(settings.log_format);

    info!("Starting data file replacement runner");
    info!(
        "Replacing file {} with {} (fixture: {})",
        settings.original_file_id,
        settings.replacement_file_id,
        settings.fixture.display()
    );

    let fixture = tokio::fs::read_to_string(&settings.fixture)
        .await
        .with_context(|| format!("Failed to read fixture {}", settings.fixture.display()))?;
    let snapshot: StoreSnapshot = serde_json::from_str(&fixture)
        .with_context(|| format!("Failed to parse fixture {}", settings.fixture.display()))?;

    let statistics = Arc::new(StatisticsStore::new());
    let content = Arc::new(ContentStore::new());
    let data_sets = Arc::new(InMemoryDataSetVersions::new());
    snapshot.load_into(&statistics, &content, &data_sets).await;

    let service = ReplacementService::new(
        statistics.clone(),
        content.clone(),
        data_sets.clone(),
        Arc::new(StoreFileRemover::new(statistics.clone(), content.clone())),
    );

    let plan = service
        .get_replacement_plan(settings.original_file_id, settings.replacement_file_id)
        .await
        .map_err(report)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    if !settings.apply {
        info!("Plan only, nothing applied (valid: {})", plan.valid);
        return Ok(());
    }

    service
        .replace(settings.original_file_id, settings.replacement_file_id)
        .await
        .map_err(report)?;
    info!("Replacement applied");

    match &settings.output {
        Some(path) => {
            let state = StoreSnapshot::capture(&statistics, &content, &data_sets).await;
            tokio::fs::write(path, serde_json::to_string_pretty(&state)?)
                .await
                .with_context(|| format!("Failed to write state to {}", path.display()))?;
            info!("Wrote resulting state to {}", path.display());
        }
        None => warn!("REPLACEMENT_OUTPUT not set, resulting state discarded"),
    }

    Ok(())
}

/// Print the error response and hand the error back for the exit status
fn report(err: ReplacementError) -> anyhow::Error {
    if err.is_fatal() {
        error!("Replacement failed: {}", err);
    } else {
        warn!("Replacement refused: {}", err);
    }
    match serde_json::to_string_pretty(&err.to_response()) {
        Ok(body) => println!("{}", body),
        Err(e) => error!("Failed to serialize error response: {}", e),
    }
    err.into()
}

/// Initialize tracing with structured logging
fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,datafile_replacement=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().with_writer(std::io::stderr).json())
            .init(),
    }
}
