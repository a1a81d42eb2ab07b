//! Progress callbacks for pipeline runs.

use tracing::{info, warn};

use crate::pipeline::{BatchSummary, TickerReport};

/// Observer for a batch run. All methods default to no-ops.
pub trait PipelineProgress: Send + Sync {
    fn on_ticker_start(&self, _ticker: &str, _index: usize, _total: usize) {}
    fn on_ticker_complete(&self, _report: &TickerReport) {}
    fn on_batch_complete(&self, _summary: &BatchSummary) {}
}

/// Discards every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl PipelineProgress for NoProgress {}

/// Reports progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl PipelineProgress for LogProgress {
    fn on_ticker_start(&self, ticker: &str, index: usize, total: usize) {
        info!(ticker, n = index + 1, total, "processing ticker");
    }

    fn on_ticker_complete(&self, report: &TickerReport) {
        if report.has_failures() {
            warn!(ticker = %report.ticker, failures = report.failures(), "ticker finished with failures");
        } else {
            info!(ticker = %report.ticker, written = report.written(), "ticker finished");
        }
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        info!(
            tickers = summary.tickers.len(),
            written = summary.written(),
            failures = summary.failures(),
            cancelled = summary.cancelled,
            "batch finished"
        );
    }
}
