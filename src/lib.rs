// =============================================================================
// Bar Indicator Engine
// =============================================================================
//
// Streaming multi-indicator computation over ordered OHLC bars: simple and
// exponential moving averages, momentum oscillators and a composite market
// regime, each with independent state per (instrument, timeframe).  Output
// rows are batched into staging and upserted by bar id.
// =============================================================================

pub mod averages;
pub mod batch_writer;
pub mod engine_config;
pub mod error;
pub mod indicators;
pub mod momentum;
pub mod orchestrator;
pub mod regime;
pub mod rows;
pub mod source;
pub mod storage;
pub mod types;

pub use engine_config::EngineConfig;
pub use error::{EngineError, StorageError};
pub use orchestrator::{Pipeline, RunOptions, RunSummary};
pub use source::{BarSource, JsonLinesBarSource, VecBarSource};
pub use storage::{IndicatorStore, JsonFileStore, MemoryStore};
pub use types::{Bar, BarFilter, GroupKey};
