//! Indicator recompute over every ticker that has bars.
//!
//! Computation runs on the rayon pool when `parallel` is set; writes are
//! serialized by the store's connection mutex.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use tickerlake_core::indicators::IndicatorEngine;
use tickerlake_core::store::{Store, StoreError};

use crate::pipeline::{IndicatorOutcome, PipelineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerRecompute {
    pub ticker: String,
    pub outcome: IndicatorOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecomputeSummary {
    pub tickers: Vec<TickerRecompute>,
    pub cancelled: bool,
}

impl RecomputeSummary {
    pub fn rows_written(&self) -> usize {
        self.tickers
            .iter()
            .map(|t| match &t.outcome {
                IndicatorOutcome::Computed { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.tickers
            .iter()
            .filter(|t| matches!(t.outcome, IndicatorOutcome::Failed { .. }))
            .count()
    }
}

pub struct BatchRecompute<'a> {
    store: &'a Store,
    engine: IndicatorEngine,
    parallel: bool,
    as_of: NaiveDate,
}

impl<'a> BatchRecompute<'a> {
    pub fn new(store: &'a Store, engine: IndicatorEngine, as_of: NaiveDate) -> Self {
        Self {
            store,
            engine,
            parallel: false,
            as_of,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Recompute every ticker with bars in any source.
    pub fn run_all(&self, cancel: &AtomicBool) -> Result<RecomputeSummary, PipelineError> {
        let tickers = self.store.tickers_with_bars(None)?;
        self.run(&tickers, cancel)
    }

    /// Recompute the given tickers. Cancelled tickers are left out of the summary.
    pub fn run(&self, tickers: &[String], cancel: &AtomicBool) -> Result<RecomputeSummary, PipelineError> {
        info!(tickers = tickers.len(), parallel = self.parallel, "recomputing indicators");

        let results: Vec<Option<TickerRecompute>> = if self.parallel {
            tickers
                .par_iter()
                .map(|ticker| self.one(ticker, cancel))
                .collect::<Result<Vec<_>, StoreError>>()?
        } else {
            tickers
                .iter()
                .map(|ticker| self.one(ticker, cancel))
                .collect::<Result<Vec<_>, StoreError>>()?
        };

        let done: Vec<TickerRecompute> = results.into_iter().flatten().collect();
        let summary = RecomputeSummary {
            cancelled: done.len() < tickers.len(),
            tickers: done,
        };
        info!(
            tickers = summary.tickers.len(),
            rows = summary.rows_written(),
            failures = summary.failures(),
            cancelled = summary.cancelled,
            "indicator recompute finished"
        );
        Ok(summary)
    }

    fn one(&self, ticker: &str, cancel: &AtomicBool) -> Result<Option<TickerRecompute>, StoreError> {
        if cancel.load(Ordering::Relaxed) {
            return Ok(None);
        }
        let window = self.engine.window_ending(self.as_of);
        let outcome = match self.engine.recompute(self.store, ticker, window) {
            Ok(Some(run)) => IndicatorOutcome::Computed {
                source: run.source,
                rows: run.rows_written,
                digest: run.output_digest.0,
            },
            Ok(None) => IndicatorOutcome::NoBars,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(ticker, error = %e, "indicator recompute failed");
                IndicatorOutcome::Failed { reason: e.to_string() }
            }
        };
        Ok(Some(TickerRecompute {
            ticker: ticker.to_string(),
            outcome,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickerlake_core::domain::Bar;

    fn seed(store: &Store, ticker: &str, source: &str, n: usize) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let close = 100.0 + i as f64;
                Bar {
                    ticker: ticker.into(),
                    date: start + chrono::Duration::days(i as i64),
                    open: close,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 1_000,
                    source: source.into(),
                }
            })
            .collect();
        store.upsert_bars(ticker, &bars).unwrap();
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn recomputes_every_ticker_with_bars() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, "AAA", "yfinance", 30);
        seed(&store, "BBB", "polygon", 10);

        let summary = BatchRecompute::new(&store, IndicatorEngine::default(), as_of())
            .run_all(&AtomicBool::new(false))
            .unwrap();

        assert_eq!(summary.tickers.len(), 2);
        assert_eq!(summary.rows_written(), 40);
        assert!(!summary.cancelled);
        let bbb = summary.tickers.iter().find(|t| t.ticker == "BBB").unwrap();
        assert!(matches!(&bbb.outcome, IndicatorOutcome::Computed { source, .. } if source == "polygon"));
    }

    #[test]
    fn parallel_matches_sequential() {
        let store = Store::open_in_memory().unwrap();
        for t in ["AAA", "BBB", "CCC", "DDD"] {
            seed(&store, t, "alphavantage", 40);
        }
        let cancel = AtomicBool::new(false);

        let seq = BatchRecompute::new(&store, IndicatorEngine::default(), as_of())
            .run_all(&cancel)
            .unwrap();
        let par = BatchRecompute::new(&store, IndicatorEngine::default(), as_of())
            .with_parallelism(true)
            .run_all(&cancel)
            .unwrap();

        assert_eq!(seq, par);
    }

    #[test]
    fn cancelled_run_skips_remaining_tickers() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, "AAA", "yfinance", 5);
        let summary = BatchRecompute::new(&store, IndicatorEngine::default(), as_of())
            .run_all(&AtomicBool::new(true))
            .unwrap();
        assert!(summary.tickers.is_empty());
        assert!(summary.cancelled);
    }
}
