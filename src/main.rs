// =============================================================================
// Bar Indicator Engine — Main Entry Point
// =============================================================================
//
// One batch pass: read bars from a JSON-lines file, compute every indicator
// family, merge the rows into the JSON indicator store, exit.
// =============================================================================

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bar_indicator_engine::engine_config::DEFAULT_CONFIG_PATH;
use bar_indicator_engine::{EngineConfig, JsonFileStore, JsonLinesBarSource, Pipeline};

fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("INDICATOR_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = EngineConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        EngineConfig::default()
    });
    config.apply_env_overrides();

    info!(
        bars = %config.bars_path,
        store = %config.store_path,
        batch_size = config.batch_size,
        use_existing_ema = config.use_existing_ema,
        filter = ?config.filter,
        "Bar indicator engine starting"
    );

    // ── 2. Collaborators ─────────────────────────────────────────────────
    let source = JsonLinesBarSource::new(&config.bars_path);
    let mut store = JsonFileStore::open(&config.store_path)
        .with_context(|| format!("failed to open indicator store {}", config.store_path))?;

    // ── 3. Run ───────────────────────────────────────────────────────────
    let summary = Pipeline::new(config.run_options())
        .run(&source, &mut store)
        .context("indicator run failed")?;

    info!(
        run_id = %summary.run_id,
        bars = summary.bars,
        groups = summary.groups,
        flushes = summary.flushes,
        inserted = summary.merge.inserted(),
        updated = summary.merge.updated(),
        "Done"
    );

    Ok(())
}
