// =============================================================================
// Engine Configuration — run options with atomic save
// =============================================================================
//
// Everything one indicator run needs: batch threshold, EMA warm-start flag,
// recompute filters and the file locations used by the binary.
//
// All fields carry `#[serde(default)]` so partial files load.  Environment
// variables (INDICATOR_*) override whatever the file says.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch_writer::DEFAULT_BATCH_SIZE;
use crate::orchestrator::RunOptions;
use crate::types::BarFilter;

pub const DEFAULT_CONFIG_PATH: &str = "indicator_engine.json";

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_bars_path() -> String {
    "bars.jsonl".to_string()
}

fn default_store_path() -> String {
    "indicators.json".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Bars per staged batch.  Values below 1 are treated as 1.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Continue EMAs from the latest persisted row of each group.
    #[serde(default)]
    pub use_existing_ema: bool,

    #[serde(default)]
    pub filter: BarFilter,

    /// JSON-lines bar file read by the binary.
    #[serde(default = "default_bars_path")]
    pub bars_path: String,

    /// JSON document holding the permanent indicator tables.
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            use_existing_ema: false,
            filter: BarFilter::default(),
            bars_path: default_bars_path(),
            store_path: default_store_path(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing or unreadable file is an error; the binary falls back to
    /// defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            batch_size = config.batch_size,
            use_existing_ema = config.use_existing_ema,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise engine config")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Apply INDICATOR_* overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable lookup.  Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "INDICATOR_BATCH_SIZE") {
            self.batch_size = v;
        }
        if let Some(v) = parse_var(&lookup, "INDICATOR_USE_EXISTING_EMA") {
            self.use_existing_ema = v;
        }
        if let Some(v) = parse_var(&lookup, "INDICATOR_MAX_AGE_MINUTES") {
            self.filter.max_age_minutes = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "INDICATOR_TIMEFRAME_ID") {
            self.filter.timeframe_id = Some(v);
        }
        if let Some(v) = parse_var(&lookup, "INDICATOR_INSTRUMENT_ID") {
            self.filter.instrument_id = Some(v);
        }
        if let Some(path) = lookup("INDICATOR_BARS_PATH").filter(|p| !p.trim().is_empty()) {
            self.bars_path = path;
        }
        if let Some(path) = lookup("INDICATOR_STORE_PATH").filter(|p| !p.trim().is_empty()) {
            self.store_path = path;
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            filter: self.filter.clone(),
            use_existing_ema: self.use_existing_ema,
            batch_size: self.batch_size.max(1),
        }
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable override");
            None
        }
    }
}
