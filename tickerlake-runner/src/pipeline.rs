//! Per-ticker ingestion pipeline.
//!
//! For each ticker, in this order:
//! 1. Normalize every enabled provider's payload
//! 2. Write the records to the store (bars as a full refresh per source)
//! 3. Recompute indicator rows from the persisted bars
//! 4. Compute trailing returns from the persisted bars
//!
//! Tickers are independent. A failure inside one ticker is recorded in its
//! report and the batch moves on; only an unusable store aborts the run.
//! Cancellation is checked between tickers, so committed tickers stay intact.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use tickerlake_core::data::{NormalizeError, Normalizer, Provider};
use tickerlake_core::domain::{normalize_ticker, Bar, RecordBatch};
use tickerlake_core::indicators::IndicatorEngine;
use tickerlake_core::returns::{ReturnsCalculator, TrailingReturns};
use tickerlake_core::store::{Store, StoreError};

use crate::config::PipelineConfig;
use crate::payloads::PayloadSource;
use crate::progress::PipelineProgress;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The store cannot be opened or written at all.
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// What happened to one provider's payload for one ticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntityOutcome {
    Written { rows: usize, rejected: usize },
    /// Nothing to ingest; not an error.
    NoData,
    Malformed { reason: String },
    StoreFailed { reason: String },
}

impl EntityOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, EntityOutcome::Malformed { .. } | EntityOutcome::StoreFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndicatorOutcome {
    Computed { source: String, rows: usize, digest: String },
    NoBars,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerReport {
    pub ticker: String,
    pub providers: BTreeMap<Provider, EntityOutcome>,
    pub indicators: IndicatorOutcome,
    pub returns: TrailingReturns,
}

impl TickerReport {
    pub fn written(&self) -> usize {
        self.providers
            .values()
            .map(|o| match o {
                EntityOutcome::Written { rows, .. } => *rows,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        let entity = self.providers.values().filter(|o| o.is_failure()).count();
        let indicators = usize::from(matches!(self.indicators, IndicatorOutcome::Failed { .. }));
        entity + indicators
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub tickers: Vec<TickerReport>,
    /// Tickers that were rejected before processing (blank symbols).
    pub skipped: Vec<String>,
    pub cancelled: bool,
    pub elapsed_secs: f64,
}

impl BatchSummary {
    pub fn written(&self) -> usize {
        self.tickers.iter().map(TickerReport::written).sum()
    }

    pub fn failures(&self) -> usize {
        self.tickers.iter().map(TickerReport::failures).sum()
    }

    pub fn report(&self, ticker: &str) -> Option<&TickerReport> {
        let ticker = normalize_ticker(ticker)?;
        self.tickers.iter().find(|r| r.ticker == ticker)
    }
}

/// Wires the four components over one store and one payload source.
pub struct Pipeline<'a> {
    store: &'a Store,
    source: &'a dyn PayloadSource,
    normalizer: Normalizer,
    providers: Vec<Provider>,
    engine: IndicatorEngine,
    returns: ReturnsCalculator,
    as_of: NaiveDate,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a Store, source: &'a dyn PayloadSource, config: &PipelineConfig) -> Self {
        Self {
            store,
            source,
            normalizer: config.normalizer(),
            providers: config.ingest.providers.clone(),
            engine: config.indicator_engine(),
            returns: config.returns_calculator(),
            as_of: chrono::Local::now().date_naive(),
        }
    }

    /// Date that ends the indicator and returns windows.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Process `tickers` sequentially.
    ///
    /// Returns `Err` only when the store is unusable; every other failure is
    /// recorded in the summary.
    pub fn run<S: AsRef<str>>(
        &self,
        tickers: &[S],
        cancel: &AtomicBool,
        progress: &dyn PipelineProgress,
    ) -> Result<BatchSummary, PipelineError> {
        let started = Instant::now();
        let mut summary = BatchSummary::default();
        let total = tickers.len();

        for (index, raw) in tickers.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                info!(done = index, total, "batch cancelled");
                summary.cancelled = true;
                break;
            }
            let Some(ticker) = normalize_ticker(raw.as_ref()) else {
                warn!(ticker = raw.as_ref(), "skipping blank ticker");
                summary.skipped.push(raw.as_ref().to_string());
                continue;
            };

            progress.on_ticker_start(&ticker, index, total);
            let report = self.process_ticker(&ticker)?;
            progress.on_ticker_complete(&report);
            summary.tickers.push(report);
        }

        summary.elapsed_secs = started.elapsed().as_secs_f64();
        progress.on_batch_complete(&summary);
        Ok(summary)
    }

    /// Run the four stages for one (already normalized) ticker.
    pub fn process_ticker(&self, ticker: &str) -> Result<TickerReport, PipelineError> {
        let captured_at = chrono::Utc::now().naive_utc();
        let mut providers = BTreeMap::new();

        for &provider in &self.providers {
            let outcome = self.ingest(provider, ticker, captured_at)?;
            debug!(ticker, provider = %provider, ?outcome, "provider done");
            providers.insert(provider, outcome);
        }

        let window = self.engine.window_ending(self.as_of);
        let indicators = match self.engine.recompute(self.store, ticker, window) {
            Ok(Some(run)) => IndicatorOutcome::Computed {
                source: run.source,
                rows: run.rows_written,
                digest: run.output_digest.0,
            },
            Ok(None) => IndicatorOutcome::NoBars,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(ticker, error = %e, "indicator recompute failed");
                IndicatorOutcome::Failed { reason: e.to_string() }
            }
        };

        let returns = self.returns.compute(self.store, ticker, self.as_of);

        Ok(TickerReport {
            ticker: ticker.to_string(),
            providers,
            indicators,
            returns,
        })
    }

    fn ingest(
        &self,
        provider: Provider,
        ticker: &str,
        captured_at: chrono::NaiveDateTime,
    ) -> Result<EntityOutcome, PipelineError> {
        let Some(payload) = self.source.fetch(provider, ticker) else {
            return Ok(EntityOutcome::NoData);
        };

        let normalized = match self.normalizer.normalize(provider, ticker, &payload, captured_at) {
            Ok(n) => n,
            Err(e) => {
                warn!(ticker, provider = %provider, error = %e, "payload rejected");
                return Ok(e.into());
            }
        };
        for rejected in &normalized.rejected {
            warn!(ticker, provider = %provider, error = %rejected, "record skipped");
        }
        if normalized.is_no_data() {
            return Ok(EntityOutcome::NoData);
        }
        let rejected = normalized.rejected.len();
        if normalized.records.is_empty() {
            return Ok(EntityOutcome::Malformed {
                reason: format!("all {rejected} records rejected"),
            });
        }

        let batch: RecordBatch = normalized.records.into_iter().collect();
        match self.write(ticker, &batch) {
            Ok(rows) => Ok(EntityOutcome::Written { rows, rejected }),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(ticker, provider = %provider, error = %e, "store write failed");
                Ok(EntityOutcome::StoreFailed { reason: e.to_string() })
            }
        }
    }

    fn write(&self, ticker: &str, batch: &RecordBatch) -> Result<usize, StoreError> {
        let mut rows = 0;
        for (source, bars) in bars_by_source(&batch.bars) {
            let inconsistent = bars.iter().filter(|b| !b.is_sane()).count();
            if inconsistent > 0 {
                debug!(ticker, source = %source, inconsistent, "bars with inconsistent OHLC stored as reported");
            }
            rows += self.store.replace_bars(ticker, &source, &bars)?.written;
        }
        if !batch.quotes.is_empty() {
            rows += self.store.upsert_quotes(&batch.quotes)?;
        }
        if !batch.profiles.is_empty() {
            rows += self.store.upsert_profiles(&batch.profiles)?;
        }
        if !batch.news.is_empty() {
            rows += self.store.upsert_news(&batch.news)?;
        }
        if !batch.fundamentals.is_empty() {
            rows += self.store.upsert_fundamentals(&batch.fundamentals)?;
        }
        Ok(rows)
    }
}

fn bars_by_source(bars: &[Bar]) -> BTreeMap<String, Vec<Bar>> {
    let mut grouped: BTreeMap<String, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        grouped.entry(bar.source.clone()).or_default().push(bar.clone());
    }
    grouped
}

/// Treat a normalization error as the malformed-payload outcome.
impl From<NormalizeError> for EntityOutcome {
    fn from(e: NormalizeError) -> Self {
        EntityOutcome::Malformed { reason: e.to_string() }
    }
}
