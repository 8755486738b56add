// =============================================================================
// Orchestrator — single ordered pass over bars
// =============================================================================
//
// For each bar from the source:
//   1. validate prices and per-group ordering
//   2. route by (instrument, timeframe) to that group's four engines
//   3. hand the bar's rows to the batch writer (flushes to staging at the
//      threshold)
//
// When the cursor is exhausted the remainder is staged and staging is merged
// into the permanent tables.  Any error aborts the run: staging is discarded
// and nothing is merged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::averages::{EmaState, EmaValues, MovingAverageState};
use crate::batch_writer::{BatchWriter, DEFAULT_BATCH_SIZE};
use crate::error::EngineError;
use crate::momentum::MomentumState;
use crate::regime::RegimeState;
use crate::rows::{BarRows, RowHeader};
use crate::source::BarSource;
use crate::storage::{IndicatorStore, MergeSummary};
use crate::types::{Bar, BarFilter, GroupKey};

// =============================================================================
// Options / summary
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub filter: BarFilter,
    /// Seed EMAs from the latest persisted row per group.
    pub use_existing_ema: bool,
    pub batch_size: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            filter: BarFilter::default(),
            use_existing_ema: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub bars: usize,
    pub groups: usize,
    pub flushes: usize,
    pub merge: MergeSummary,
}

// =============================================================================
// Group State Registry
// =============================================================================

/// Every engine's rolling state for one group.
#[derive(Debug, Clone)]
pub struct GroupState {
    moving_averages: MovingAverageState,
    ema: EmaState,
    momentum: MomentumState,
    regime: RegimeState,
    last_timestamp: Option<DateTime<Utc>>,
}

impl GroupState {
    fn new(ema: EmaState) -> Self {
        Self {
            moving_averages: MovingAverageState::new(),
            ema,
            momentum: MomentumState::new(),
            regime: RegimeState::new(),
            last_timestamp: None,
        }
    }

    fn update(&mut self, bar: &Bar) -> BarRows {
        self.last_timestamp = Some(bar.timestamp);
        BarRows {
            header: RowHeader::from(bar),
            moving_averages: self.moving_averages.update(bar.close),
            ema: self.ema.update(bar.close),
            momentum: self.momentum.update(bar.high, bar.low, bar.close),
            regime: self.regime.update(bar.open, bar.high, bar.low, bar.close),
        }
    }
}

/// Per-group state, created lazily on a group's first bar.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: HashMap<GroupKey, GroupState>,
    seeds: HashMap<GroupKey, EmaValues>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose groups start from persisted EMA values where available.
    pub fn with_seeds(seeds: HashMap<GroupKey, EmaValues>) -> Self {
        Self {
            groups: HashMap::new(),
            seeds,
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Feed one bar to its group and return the rows it produces.
    pub fn process(&mut self, bar: &Bar) -> Result<BarRows, EngineError> {
        bar.validate()?;
        let key = bar.key();

        let seeds = &mut self.seeds;
        let state = self.groups.entry(key).or_insert_with(|| {
            let ema = match seeds.remove(&key) {
                Some(seed) => EmaState::from_seed(seed),
                None => EmaState::cold(),
            };
            debug!(group = %key, seeded = ema.is_seeded(), "New group");
            GroupState::new(ema)
        });

        if let Some(previous) = state.last_timestamp {
            if bar.timestamp < previous {
                return Err(EngineError::OutOfOrder {
                    bar_id: bar.id,
                    group: key,
                    timestamp: bar.timestamp,
                    previous,
                });
            }
        }

        Ok(state.update(bar))
    }
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: RunOptions,
}

impl Pipeline {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn run<S, T>(&self, source: &S, store: &mut T) -> Result<RunSummary, EngineError>
    where
        S: BarSource + ?Sized,
        T: IndicatorStore + ?Sized,
    {
        self.run_at(source, store, Utc::now())
    }

    /// Run against an explicit clock; `now` anchors the max-age filter.
    pub fn run_at<S, T>(
        &self,
        source: &S,
        store: &mut T,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, EngineError>
    where
        S: BarSource + ?Sized,
        T: IndicatorStore + ?Sized,
    {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            batch_size = self.options.batch_size,
            use_existing_ema = self.options.use_existing_ema,
            filter = ?self.options.filter,
            "Indicator run starting"
        );
        self.check_options(run_id);

        match self.execute(run_id, source, store, now) {
            Ok(summary) => {
                info!(
                    %run_id,
                    bars = summary.bars,
                    groups = summary.groups,
                    flushes = summary.flushes,
                    inserted = summary.merge.inserted(),
                    updated = summary.merge.updated(),
                    tables = %summary.merge,
                    "Indicator run complete"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(%run_id, error = %e, "Indicator run aborted");
                if let Err(discard) = store.discard_staged() {
                    warn!(%run_id, error = %discard, "Failed to discard staged rows");
                }
                Err(e)
            }
        }
    }

    /// Seeding from history contradicts a filtered recompute.  Warn, then go on.
    fn check_options(&self, run_id: Uuid) {
        if self.options.use_existing_ema && !self.options.filter.is_full_recompute() {
            warn!(
                %run_id,
                filter = ?self.options.filter,
                "use_existing_ema is combined with recompute filters; proceeding"
            );
        }
    }

    fn execute<S, T>(
        &self,
        run_id: Uuid,
        source: &S,
        store: &mut T,
        now: DateTime<Utc>,
    ) -> Result<RunSummary, EngineError>
    where
        S: BarSource + ?Sized,
        T: IndicatorStore + ?Sized,
    {
        let mut registry = if self.options.use_existing_ema {
            let seeds = store.latest_ema_seeds()?;
            info!(%run_id, groups = seeds.len(), "Loaded EMA seeds");
            GroupRegistry::with_seeds(seeds)
        } else {
            GroupRegistry::new()
        };

        let query = self.options.filter.resolve(now);
        let mut writer = BatchWriter::new(&mut *store, self.options.batch_size);

        for bar in source.bars(&query)? {
            let bar = bar?;
            let rows = registry.process(&bar)?;
            writer.push(rows)?;
        }

        let bars = writer.processed();
        let flushes = writer.finish()?;
        let merge = store.merge_staged()?;

        Ok(RunSummary {
            run_id,
            bars,
            groups: registry.len(),
            flushes,
            merge,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{BarCursor, VecBarSource};
    use crate::storage::{MemoryStore, EMA, REGIME_FINAL};
    use crate::types::BarQuery;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap()
    }

    fn make_bar(id: i64, instrument_id: i32, minute: i64, close: f64) -> Bar {
        Bar {
            id,
            instrument_id,
            timeframe_id: 1,
            timestamp: t0() + Duration::minutes(minute),
            open: close - 0.3,
            high: close + 1.0,
            low: close - 1.0,
            close,
        }
    }

    fn series(instrument_id: i32, first_id: i64, n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.37).sin() * 5.0 + i as f64 * 0.05;
                make_bar(first_id + i as i64, instrument_id, i as i64, close)
            })
            .collect()
    }

    fn options(batch_size: usize) -> RunOptions {
        RunOptions {
            batch_size,
            ..Default::default()
        }
    }

    /// Yields bars exactly as given, without sorting.
    struct RawSource(Vec<Bar>);

    impl BarSource for RawSource {
        fn bars(&self, _query: &BarQuery) -> Result<BarCursor<'_>, EngineError> {
            Ok(Box::new(self.0.iter().cloned().map(Ok)))
        }
    }

    #[test]
    fn moving_average_example() {
        let bars: Vec<Bar> = [10.0, 12.0, 11.0, 13.0, 9.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| make_bar(i as i64 + 1, 1, i as i64, c))
            .collect();
        let mut store = MemoryStore::new();
        let summary = Pipeline::default()
            .run(&VecBarSource::new(bars), &mut store)
            .unwrap();
        assert_eq!(summary.bars, 5);
        assert_eq!(summary.groups, 1);
        assert!((store.tables().moving_averages[&5].values.ma5 - 11.0).abs() < 1e-10);
        assert!((store.tables().moving_averages[&1].values.ma5 - 10.0).abs() < 1e-10);
    }

    #[test]
    fn rerun_is_idempotent() {
        let source = VecBarSource::new(series(1, 1, 60));
        let mut store = MemoryStore::new();

        let first = Pipeline::new(options(25)).run(&source, &mut store).unwrap();
        let snapshot = store.tables().clone();
        assert_eq!(first.merge.table(EMA).inserted, 60);

        let second = Pipeline::new(options(7)).run(&source, &mut store).unwrap();
        assert_eq!(second.merge.inserted(), 0);
        assert_eq!(second.merge.table(REGIME_FINAL).updated, 60);
        assert_eq!(store.tables(), &snapshot);
        assert_ne!(first.run_id, second.run_id);
    }

    #[test]
    fn flush_count_follows_batch_size() {
        let source = VecBarSource::new(series(1, 1, 25));
        let mut store = MemoryStore::new();
        let summary = Pipeline::new(options(10)).run(&source, &mut store).unwrap();
        assert_eq!(summary.flushes, 3);
        assert_eq!(summary.bars, 25);
        assert_eq!(store.staged_len(), 0);
        assert_eq!(store.tables().regime_stops.len(), 25);
    }

    #[test]
    fn empty_source_merges_nothing() {
        let mut store = MemoryStore::new();
        let summary = Pipeline::default()
            .run(&VecBarSource::new(Vec::new()), &mut store)
            .unwrap();
        assert_eq!(summary.bars, 0);
        assert_eq!(summary.flushes, 0);
        assert_eq!(summary.merge.inserted(), 0);
    }

    #[test]
    fn warm_start_continues_the_ema_series() {
        let all = series(4, 1, 40);
        let (head, tail) = all.split_at(25);

        let mut full_store = MemoryStore::new();
        Pipeline::default()
            .run(&VecBarSource::new(all.clone()), &mut full_store)
            .unwrap();

        let mut store = MemoryStore::new();
        Pipeline::default()
            .run(&VecBarSource::new(head.to_vec()), &mut store)
            .unwrap();
        let warm = RunOptions {
            use_existing_ema: true,
            ..Default::default()
        };
        Pipeline::new(warm)
            .run(&VecBarSource::new(tail.to_vec()), &mut store)
            .unwrap();

        for bar in tail {
            let expected: [f64; 13] = full_store.tables().ema[&bar.id].values.into();
            let got: [f64; 13] = store.tables().ema[&bar.id].values.into();
            for (e, g) in expected.iter().zip(got.iter()) {
                assert!((e - g).abs() < 1e-9, "bar {}", bar.id);
            }
        }

        // a cold run over the tail alone restarts from the first close
        let mut cold = MemoryStore::new();
        Pipeline::default()
            .run(&VecBarSource::new(tail.to_vec()), &mut cold)
            .unwrap();
        let first_tail = &cold.tables().ema[&tail[0].id].values;
        assert_eq!(first_tail.ema_200_long, tail[0].close);
    }

    #[test]
    fn unseeded_group_is_close_seeded_in_warm_mode() {
        let mut store = MemoryStore::new();
        let warm = RunOptions {
            use_existing_ema: true,
            ..Default::default()
        };
        let bars = series(9, 1, 3);
        Pipeline::new(warm)
            .run(&VecBarSource::new(bars.clone()), &mut store)
            .unwrap();
        assert_eq!(store.tables().ema[&1].values.ema_5_short, bars[0].close);
    }

    #[test]
    fn warm_start_with_filter_still_runs() {
        let mut store = MemoryStore::new();
        let opts = RunOptions {
            use_existing_ema: true,
            filter: BarFilter {
                instrument_id: Some(1),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut bars = series(1, 1, 5);
        bars.extend(series(2, 100, 5));
        let summary = Pipeline::new(opts)
            .run(&VecBarSource::new(bars), &mut store)
            .unwrap();
        assert_eq!(summary.bars, 5);
        assert_eq!(summary.groups, 1);
    }

    #[test]
    fn max_age_filter_uses_run_clock() {
        let mut store = MemoryStore::new();
        let opts = RunOptions {
            filter: BarFilter {
                max_age_minutes: Some(10),
                ..Default::default()
            },
            ..Default::default()
        };
        // bars at minutes 0..30, clock at minute 29: keep minutes 20..=29
        let now = t0() + Duration::minutes(29);
        let summary = Pipeline::new(opts)
            .run_at(&VecBarSource::new(series(1, 1, 30)), &mut store, now)
            .unwrap();
        assert_eq!(summary.bars, 10);
        assert!(store.tables().ema.contains_key(&21));
        assert!(!store.tables().ema.contains_key(&20));
    }

    #[test]
    fn bad_bar_aborts_without_merging() {
        let mut bars = series(1, 1, 30);
        bars[17].close = f64::NAN;
        let mut store = MemoryStore::new();
        let err = Pipeline::new(options(5))
            .run(&VecBarSource::new(bars), &mut store)
            .unwrap_err();
        assert!(matches!(err, EngineError::Computation { bar_id: 18, .. }));
        assert!(store.tables().ema.is_empty());
        assert_eq!(store.staged_len(), 0);
    }

    #[test]
    fn out_of_order_bar_aborts() {
        let mut bars = series(1, 1, 10);
        bars.swap(3, 4);
        let mut store = MemoryStore::new();
        let err = Pipeline::default()
            .run(&RawSource(bars), &mut store)
            .unwrap_err();
        match err {
            EngineError::OutOfOrder { bar_id, group, .. } => {
                assert_eq!(bar_id, 4);
                assert_eq!(group, GroupKey::new(1, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(store.tables().moving_averages.is_empty());
    }

    #[test]
    fn groups_do_not_interact() {
        let a = series(1, 1, 40);
        let b: Vec<Bar> = series(2, 1000, 40)
            .into_iter()
            .map(|mut bar| {
                bar.close *= 3.0;
                bar.high = bar.close + 4.0;
                bar.low = bar.close - 2.0;
                bar
            })
            .collect();

        let mut alone = MemoryStore::new();
        Pipeline::default()
            .run(&VecBarSource::new(a.clone()), &mut alone)
            .unwrap();

        // interleave so the groups alternate in the stream
        let mut mixed = Vec::new();
        for (x, y) in a.iter().zip(b.iter()) {
            mixed.push(x.clone());
            mixed.push(y.clone());
        }
        let mut together = MemoryStore::new();
        let summary = Pipeline::default()
            .run(&RawSource(mixed), &mut together)
            .unwrap();
        assert_eq!(summary.groups, 2);

        for bar in &a {
            assert_eq!(
                alone.tables().momentum[&bar.id],
                together.tables().momentum[&bar.id]
            );
            assert_eq!(
                alone.tables().regime_final[&bar.id],
                together.tables().regime_final[&bar.id]
            );
            assert_eq!(
                alone.tables().moving_averages[&bar.id],
                together.tables().moving_averages[&bar.id]
            );
        }
    }

    #[test]
    fn regime_change_flag_on_each_groups_first_bar() {
        let mut bars = series(1, 1, 30);
        bars.extend(series(2, 100, 30));
        let mut store = MemoryStore::new();
        Pipeline::default()
            .run(&VecBarSource::new(bars), &mut store)
            .unwrap();

        let finals = &store.tables().regime_final;
        assert!(finals[&1].values.regime_change_flag);
        assert!(finals[&100].values.regime_change_flag);

        for ids in [1..30_i64, 100..129] {
            for id in ids {
                let prev = finals[&id].values.primary_regime;
                let cur = &finals[&(id + 1)].values;
                assert_eq!(cur.regime_change_flag, cur.primary_regime != prev);
            }
        }
    }

    #[test]
    fn equal_timestamps_are_accepted() {
        let mut bars = series(1, 1, 3);
        bars[2].timestamp = bars[1].timestamp;
        let mut store = MemoryStore::new();
        let summary = Pipeline::default()
            .run(&RawSource(bars), &mut store)
            .unwrap();
        assert_eq!(summary.bars, 3);
    }
}
