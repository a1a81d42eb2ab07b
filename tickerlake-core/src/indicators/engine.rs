//! Indicator Engine: bar series in, one `IndicatorRow` per date out.
//!
//! Rows are computed from exactly one source's bars. The engine walks its
//! source chain and uses the first source with bars in the window; sources
//! are never mixed within a run.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::atr::Atr;
use super::bollinger::Bollinger;
use super::ema::Ema;
use super::macd::{Macd, MacdLine};
use super::rsi::Rsi;
use super::sma::Sma;
use super::Indicator;
use crate::domain::{canonical_or_empty, tags, Bar, DateWindow, IndicatorRow, SourceChain};
use crate::fingerprint::{bars_digest, rows_digest, Digest};
use crate::store::{BarHistory, Store, StoreError};

/// Calendar days of bars loaded per recompute by default.
pub const DEFAULT_HISTORY_DAYS: u32 = 500;

/// One `IndicatorRow` column and the indicator that fills it.
pub struct RowColumn {
    pub indicator: Box<dyn Indicator>,
    set: fn(&mut IndicatorRow, Option<f64>),
}

impl RowColumn {
    fn new(indicator: impl Indicator + 'static, set: fn(&mut IndicatorRow, Option<f64>)) -> Self {
        Self {
            indicator: Box::new(indicator),
            set,
        }
    }
}

/// The indicator set behind every persisted row, in column order.
pub fn row_columns() -> Vec<RowColumn> {
    vec![
        RowColumn::new(Sma::new(20), |r, v| r.sma_20 = v),
        RowColumn::new(Sma::new(50), |r, v| r.sma_50 = v),
        RowColumn::new(Sma::new(200), |r, v| r.sma_200 = v),
        RowColumn::new(Ema::new(12), |r, v| r.ema_12 = v),
        RowColumn::new(Ema::new(26), |r, v| r.ema_26 = v),
        RowColumn::new(Macd::standard(MacdLine::Line), |r, v| r.macd = v),
        RowColumn::new(Macd::standard(MacdLine::Signal), |r, v| r.macd_signal = v),
        RowColumn::new(Macd::standard(MacdLine::Histogram), |r, v| r.macd_histogram = v),
        RowColumn::new(Rsi::new(14), |r, v| r.rsi_14 = v),
        RowColumn::new(Bollinger::upper(20, 2.0), |r, v| r.bollinger_upper = v),
        RowColumn::new(Bollinger::middle(20, 2.0), |r, v| r.bollinger_middle = v),
        RowColumn::new(Bollinger::lower(20, 2.0), |r, v| r.bollinger_lower = v),
        RowColumn::new(Atr::new(14), |r, v| r.atr_14 = v),
    ]
}

/// Compute the full indicator vector for every bar in `bars`.
///
/// `bars` must be one source's series, ascending by date. The output has one
/// row per input bar, in the same order; values without enough trailing
/// history are `None`.
pub fn compute_indicator_rows(ticker: &str, source: &str, bars: &[Bar]) -> Vec<IndicatorRow> {
    let mut rows: Vec<IndicatorRow> = bars
        .iter()
        .map(|bar| IndicatorRow::empty(ticker, bar.date, source))
        .collect();
    for column in row_columns() {
        let values = column.indicator.compute(bars);
        for (row, value) in rows.iter_mut().zip(values) {
            (column.set)(row, value);
        }
    }
    rows
}

/// Outcome of one engine run for one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRun {
    pub ticker: String,
    /// Source whose bars fed every row.
    pub source: String,
    pub rows_written: usize,
    pub input_digest: Digest,
    pub output_digest: Digest,
}

/// Reads persisted bars, computes indicator rows and upserts them.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    sources: SourceChain,
    history_days: u32,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(
            SourceChain::new([tags::YFINANCE, tags::ALPHAVANTAGE, tags::POLYGON]),
            DEFAULT_HISTORY_DAYS,
        )
    }
}

impl IndicatorEngine {
    pub fn new(sources: SourceChain, history_days: u32) -> Self {
        Self {
            sources,
            history_days,
        }
    }

    pub fn sources(&self) -> &SourceChain {
        &self.sources
    }

    /// The bar window loaded for a run ending at `as_of`.
    pub fn window_ending(&self, as_of: NaiveDate) -> DateWindow {
        DateWindow::trailing_days(as_of, self.history_days)
    }

    /// Pick the first source in the chain with bars in `window` and return
    /// its series. `None` when no source has any.
    pub fn select_series(
        &self,
        history: &impl BarHistory,
        ticker: &str,
        window: DateWindow,
    ) -> Result<Option<(String, Vec<Bar>)>, StoreError> {
        for source in self.sources.iter() {
            let bars = history.bars_between(ticker, source, window)?;
            if !bars.is_empty() {
                return Ok(Some((source.to_string(), bars)));
            }
            debug!(ticker, source, "no bars in window; trying next source");
        }
        Ok(None)
    }

    /// Compute rows for `ticker` without writing them.
    pub fn compute(
        &self,
        history: &impl BarHistory,
        ticker: &str,
        window: DateWindow,
    ) -> Result<Option<(String, Vec<Bar>, Vec<IndicatorRow>)>, StoreError> {
        let ticker = canonical_or_empty(ticker);
        let Some((source, bars)) = self.select_series(history, &ticker, window)? else {
            return Ok(None);
        };
        let rows = compute_indicator_rows(&ticker, &source, &bars);
        Ok(Some((source, bars, rows)))
    }

    /// Recompute and upsert indicator rows for `ticker` over `window`.
    ///
    /// Returns `None` when no source in the chain has bars for the window.
    pub fn recompute(
        &self,
        store: &Store,
        ticker: &str,
        window: DateWindow,
    ) -> Result<Option<IndicatorRun>, StoreError> {
        let Some((source, bars, rows)) = self.compute(store, ticker, window)? else {
            info!(ticker, sources = %self.sources, "no bars for indicators");
            return Ok(None);
        };
        let rows_written = store.upsert_indicator_rows(&rows)?;
        let run = IndicatorRun {
            ticker: canonical_or_empty(ticker),
            source,
            rows_written,
            input_digest: bars_digest(&bars),
            output_digest: rows_digest(&rows),
        };
        info!(
            ticker = %run.ticker,
            source = %run.source,
            rows = run.rows_written,
            digest = run.output_digest.short(),
            "indicators recomputed"
        );
        Ok(Some(run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 10.0 + i as f64).collect()
    }

    fn tagged(closes: &[f64], ticker: &str, source: &str) -> Vec<Bar> {
        make_bars(closes)
            .into_iter()
            .map(|mut b| {
                b.ticker = ticker.into();
                b.source = source.into();
                b
            })
            .collect()
    }

    #[test]
    fn one_row_per_bar_with_warmups() {
        let bars = make_bars(&ramp(30));
        let rows = compute_indicator_rows("TEST", "test", &bars);
        assert_eq!(rows.len(), 30);

        assert!(rows[18].sma_20.is_none());
        assert_approx(rows[19].sma_20.unwrap(), 19.5, DEFAULT_EPSILON);
        assert!(rows[29].sma_50.is_none());
        assert!(rows.iter().all(|r| r.ema_12.is_some() && r.macd_signal.is_some()));
        assert!(rows[13].rsi_14.is_none());
        assert_eq!(rows[14].rsi_14, Some(100.0));
        assert!(rows[13].atr_14.is_none());
        assert!(rows[14].atr_14.is_some());
        assert_eq!(rows[19].bollinger_middle, rows[19].sma_20);
        assert!(rows.iter().all(|r| r.derived_from == "test"));
    }

    #[test]
    fn row_columns_carry_their_indicator_output() {
        let closes: Vec<f64> = (0..80).map(|i| 50.0 + (i as f64 * 0.21).cos() * 3.0).collect();
        let bars = make_bars(&closes);
        let rows = compute_indicator_rows("TEST", "test", &bars);

        let macd_signal = Macd::standard(MacdLine::Signal).compute(&bars);
        let upper = Bollinger::upper(20, 2.0).compute(&bars);
        let lower = Bollinger::lower(20, 2.0).compute(&bars);
        let ema_26 = Ema::new(26).compute(&bars);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.macd_signal, macd_signal[i]);
            assert_eq!(row.bollinger_upper, upper[i]);
            assert_eq!(row.bollinger_lower, lower[i]);
            assert_eq!(row.ema_26, ema_26[i]);
        }

        let names: Vec<String> = row_columns().iter().map(|c| c.indicator.name().to_string()).collect();
        assert_eq!(names.len(), 13);
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn rows_are_bit_identical_across_runs() {
        let closes: Vec<f64> = (0..260).map(|i| 100.0 + (i as f64 * 0.37).sin() * 5.0).collect();
        let bars = make_bars(&closes);
        let a = compute_indicator_rows("TEST", "test", &bars);
        let b = compute_indicator_rows("TEST", "test", &bars);
        assert_eq!(rows_digest(&a), rows_digest(&b));
    }

    #[test]
    fn recompute_uses_first_source_with_bars() {
        let store = Store::open_in_memory().unwrap();
        store.upsert_bars("ACME", &tagged(&ramp(25), "ACME", "alphavantage")).unwrap();
        store.upsert_bars("ACME", &tagged(&ramp(25).iter().map(|c| c * 2.0).collect::<Vec<_>>(), "ACME", "polygon")).unwrap();

        let engine = IndicatorEngine::default();
        let window = DateWindow::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        let run = engine.recompute(&store, "acme", window).unwrap().unwrap();
        assert_eq!(run.ticker, "ACME");
        assert_eq!(run.source, "alphavantage");
        assert_eq!(run.rows_written, 25);

        let rows = store.indicator_rows("ACME", window).unwrap();
        assert_eq!(rows.len(), 25);
        assert_approx(rows[19].sma_20.unwrap(), 19.5, DEFAULT_EPSILON);
        assert!(rows.iter().all(|r| r.derived_from == "alphavantage"));

        let again = engine.recompute(&store, "ACME", window).unwrap().unwrap();
        assert_eq!(run.output_digest, again.output_digest);
        assert_eq!(run.input_digest, again.input_digest);
    }

    #[test]
    fn recompute_without_bars_is_none() {
        let store = Store::open_in_memory().unwrap();
        let engine = IndicatorEngine::default();
        let window = engine.window_ending(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(engine.recompute(&store, "NONE", window).unwrap().is_none());
    }
}
