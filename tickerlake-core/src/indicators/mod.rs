//! Technical indicators derived from a single-source daily bar series.
//!
//! Indicators are pure functions: bar history in, series of the same length
//! out. A value is `None` where the warm-up window is not yet full or where
//! the window touches a void close. No value at row t may depend on rows
//! after t.
//!
//! Multi-series indicators (MACD, Bollinger) are exposed as separate named
//! instances per output, keeping the single-series `Indicator` trait.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod engine;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use atr::Atr;
pub use bollinger::{Bollinger, BollingerBand};
pub use ema::Ema;
pub use engine::{compute_indicator_rows, row_columns, IndicatorEngine, IndicatorRun, RowColumn};
pub use macd::{Macd, MacdLine, MacdSeries};
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::Bar;

/// A technical indicator over an ordered bar series.
pub trait Indicator: Send + Sync {
    /// Column-style name, e.g. "sma_20" or "atr_14".
    fn name(&self) -> &str;

    /// Rows that are always absent at the head of the output.
    fn lookback(&self) -> usize;

    /// Compute over the whole series. Output length equals `bars.len()`.
    fn compute(&self, bars: &[Bar]) -> Vec<Option<f64>>;
}

/// Synthetic bars from closes: open = previous close, high/low one point
/// outside the body, volume 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                ticker: "TEST".to_string(),
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
                source: "test".to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
