//! IndicatorRow: the derived indicator vector for one ticker on one date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One authoritative indicator row per (ticker, date).
///
/// `None` means "not yet computable" (insufficient trailing history or a void
/// input in the window). It is never used for a computed zero.
/// `derived_from` records which bar source fed the row; it is provenance only
/// and not part of the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi_14: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
    pub atr_14: Option<f64>,
    pub derived_from: String,
}

impl IndicatorRow {
    /// Column names in storage order, matching [`IndicatorRow::values`].
    pub const VALUE_COLUMNS: [&'static str; 13] = [
        "sma_20",
        "sma_50",
        "sma_200",
        "ema_12",
        "ema_26",
        "macd",
        "macd_signal",
        "macd_histogram",
        "rsi_14",
        "bollinger_upper",
        "bollinger_middle",
        "bollinger_lower",
        "atr_14",
    ];

    /// An all-absent row.
    pub fn empty(ticker: &str, date: NaiveDate, derived_from: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            date,
            sma_20: None,
            sma_50: None,
            sma_200: None,
            ema_12: None,
            ema_26: None,
            macd: None,
            macd_signal: None,
            macd_histogram: None,
            rsi_14: None,
            bollinger_upper: None,
            bollinger_middle: None,
            bollinger_lower: None,
            atr_14: None,
            derived_from: derived_from.to_string(),
        }
    }

    pub fn values(&self) -> [Option<f64>; 13] {
        [
            self.sma_20,
            self.sma_50,
            self.sma_200,
            self.ema_12,
            self.ema_26,
            self.macd,
            self.macd_signal,
            self.macd_histogram,
            self.rsi_14,
            self.bollinger_upper,
            self.bollinger_middle,
            self.bollinger_lower,
            self.atr_14,
        ]
    }
}
