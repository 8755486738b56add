// =============================================================================
// Bar Sources
// =============================================================================
//
// A source hands the orchestrator an ordered cursor of bars, (instrument,
// timeframe, timestamp) ascending, already narrowed by the resolved query.
// Ordering inside a group is checked again downstream.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::EngineError;
use crate::types::{Bar, BarQuery};

pub type BarCursor<'a> = Box<dyn Iterator<Item = Result<Bar, EngineError>> + 'a>;

/// Supplier of ordered bars.
pub trait BarSource {
    fn bars(&self, query: &BarQuery) -> Result<BarCursor<'_>, EngineError>;
}

// =============================================================================
// In-memory source
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct VecBarSource {
    bars: Vec<Bar>,
}

impl VecBarSource {
    pub fn new(mut bars: Vec<Bar>) -> Self {
        bars.sort_by(|a, b| {
            (a.instrument_id, a.timeframe_id, a.timestamp, a.id).cmp(&(
                b.instrument_id,
                b.timeframe_id,
                b.timestamp,
                b.id,
            ))
        });
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl BarSource for VecBarSource {
    fn bars(&self, query: &BarQuery) -> Result<BarCursor<'_>, EngineError> {
        let query = query.clone();
        Ok(Box::new(
            self.bars
                .iter()
                .filter(move |bar| query.matches(bar))
                .cloned()
                .map(Ok),
        ))
    }
}

// =============================================================================
// JSON-lines file source
// =============================================================================

/// Wire shape of one line.  Prices stay untyped so that a missing or
/// non-numeric value is reported against its bar id instead of as a parse
/// failure.  Numeric strings (`"101.25"`) are accepted.
#[derive(Debug, Deserialize)]
struct RawBar {
    id: i64,
    instrument_id: i32,
    timeframe_id: i32,
    timestamp: DateTime<Utc>,
    open: Option<Value>,
    high: Option<Value>,
    low: Option<Value>,
    close: Option<Value>,
}

fn price(bar_id: i64, name: &str, value: Option<Value>) -> Result<f64, EngineError> {
    let parsed = match value {
        None | Some(Value::Null) => {
            return Err(EngineError::computation(bar_id, format!("{name} is missing")))
        }
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    parsed.ok_or_else(|| EngineError::computation(bar_id, format!("{name} is not numeric")))
}

impl RawBar {
    fn into_bar(self) -> Result<Bar, EngineError> {
        let id = self.id;
        Ok(Bar {
            id,
            instrument_id: self.instrument_id,
            timeframe_id: self.timeframe_id,
            timestamp: self.timestamp,
            open: price(id, "open", self.open)?,
            high: price(id, "high", self.high)?,
            low: price(id, "low", self.low)?,
            close: price(id, "close", self.close)?,
        })
    }
}

/// Streams bars from a file holding one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonLinesBarSource {
    path: PathBuf,
}

impl JsonLinesBarSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BarSource for JsonLinesBarSource {
    fn bars(&self, query: &BarQuery) -> Result<BarCursor<'_>, EngineError> {
        let file = File::open(&self.path).map_err(|e| {
            EngineError::source(format!("cannot open {}: {e}", self.path.display()))
        })?;
        let query = query.clone();

        let cursor = BufReader::new(file)
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let line_no = idx + 1;
                match line {
                    Ok(text) if text.trim().is_empty() => None,
                    Ok(text) => Some(
                        serde_json::from_str::<RawBar>(&text)
                            .map_err(|e| EngineError::source(format!("line {line_no}: {e}")))
                            .and_then(RawBar::into_bar),
                    ),
                    Err(e) => Some(Err(EngineError::source(format!("line {line_no}: {e}")))),
                }
            })
            .filter(move |bar| match bar {
                Ok(bar) => query.matches(bar),
                Err(_) => true,
            });

        Ok(Box::new(cursor))
    }
}
