// =============================================================================
// Shared types used across the indicator engine
// =============================================================================
//
// A `Bar` is one OHLC observation; a `GroupKey` identifies the independent
// (instrument, timeframe) series it belongs to.  Every indicator family keeps
// its rolling state per `GroupKey`, and state for different keys never
// interacts.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Composite key that identifies one independent bar series.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GroupKey {
    pub instrument_id: i32,
    pub timeframe_id: i32,
}

impl GroupKey {
    pub fn new(instrument_id: i32, timeframe_id: i32) -> Self {
        Self {
            instrument_id,
            timeframe_id,
        }
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.instrument_id, self.timeframe_id)
    }
}

/// A single immutable OHLC bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    /// Unique bar id; every output row is keyed by it.
    pub id: i64,
    pub instrument_id: i32,
    pub timeframe_id: i32,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.instrument_id, self.timeframe_id)
    }

    /// Reject bars whose prices cannot feed the recurrences.
    ///
    /// Every OHLC field must be finite and `high` may not sit below `low`.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::computation(
                    self.id,
                    format!("{name} is not a finite number ({value})"),
                ));
            }
        }
        if self.high < self.low {
            return Err(EngineError::computation(
                self.id,
                format!("high {} is below low {}", self.high, self.low),
            ));
        }
        Ok(())
    }
}

/// Optional recompute filters.  All `None` means a full recompute over the
/// whole bar history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarFilter {
    /// Only bars newer than `now - max_age_minutes`.
    #[serde(default)]
    pub max_age_minutes: Option<i64>,
    #[serde(default)]
    pub timeframe_id: Option<i32>,
    #[serde(default)]
    pub instrument_id: Option<i32>,
}

impl BarFilter {
    /// True when no filter is set.
    pub fn is_full_recompute(&self) -> bool {
        self.max_age_minutes.is_none() && self.timeframe_id.is_none() && self.instrument_id.is_none()
    }

    /// Pin the relative age window to an absolute cut-off.
    pub fn resolve(&self, now: DateTime<Utc>) -> BarQuery {
        BarQuery {
            since: self
                .max_age_minutes
                .map(|minutes| now - Duration::minutes(minutes)),
            timeframe_id: self.timeframe_id,
            instrument_id: self.instrument_id,
        }
    }
}

/// A `BarFilter` resolved against the run clock, handed to a bar source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BarQuery {
    /// Bars must be strictly later than this instant.
    pub since: Option<DateTime<Utc>>,
    pub timeframe_id: Option<i32>,
    pub instrument_id: Option<i32>,
}

impl BarQuery {
    pub fn matches(&self, bar: &Bar) -> bool {
        if let Some(since) = self.since {
            if bar.timestamp <= since {
                return false;
            }
        }
        if let Some(tf) = self.timeframe_id {
            if bar.timeframe_id != tf {
                return false;
            }
        }
        if let Some(instrument) = self.instrument_id {
            if bar.instrument_id != instrument {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(id: i64, instrument_id: i32, timeframe_id: i32, minute: i64) -> Bar {
        Bar {
            id,
            instrument_id,
            timeframe_id,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::minutes(minute),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
        }
    }

    #[test]
    fn empty_filter_is_full_recompute() {
        assert!(BarFilter::default().is_full_recompute());
        let f = BarFilter {
            timeframe_id: Some(3),
            ..BarFilter::default()
        };
        assert!(!f.is_full_recompute());
    }

    #[test]
    fn query_matches_each_filter_independently() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::minutes(60);
        let filter = BarFilter {
            max_age_minutes: Some(30),
            timeframe_id: Some(2),
            instrument_id: Some(7),
        };
        let q = filter.resolve(now);

        assert!(q.matches(&bar(1, 7, 2, 45)));
        // exactly on the cut-off is excluded
        assert!(!q.matches(&bar(2, 7, 2, 30)));
        assert!(!q.matches(&bar(3, 7, 1, 45)));
        assert!(!q.matches(&bar(4, 8, 2, 45)));
    }

    #[test]
    fn validate_rejects_non_finite_and_inverted_bars() {
        let mut b = bar(9, 1, 1, 0);
        assert!(b.validate().is_ok());

        b.close = f64::NAN;
        assert!(matches!(
            b.validate(),
            Err(EngineError::Computation { bar_id: 9, .. })
        ));

        let mut inverted = bar(10, 1, 1, 0);
        inverted.high = 5.0;
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn group_key_display() {
        assert_eq!(GroupKey::new(12, 4).to_string(), "12@4");
    }
}
