//! Yahoo Finance v8 chart payloads.
//!
//! The chart API returns column arrays (`timestamp`, `open`, `high`, ...)
//! rather than row objects. Rows where every OHLCV value is null are
//! non-trading days and are skipped without being reported.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

use super::provider::{NormalizeError, Provider};
use crate::domain::Bar;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    result: Option<Vec<ChartData>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Bars parsed from one chart payload, plus the rows that were rejected.
pub(crate) struct ParsedChart {
    pub bars: Vec<Bar>,
    pub rejected: Vec<NormalizeError>,
}

/// Parse a chart payload into bars for `ticker`.
///
/// "Not Found" errors and responses without timestamps are empty results.
/// Any other error object, or a result without quote data, is malformed.
pub(crate) fn parse_chart(ticker: &str, payload: &Value) -> Result<ParsedChart, NormalizeError> {
    let provider = Provider::YahooChart;
    let resp: ChartResponse = serde_json::from_value(payload.clone())
        .map_err(|e| NormalizeError::malformed(provider, e.to_string()))?;

    let empty = ParsedChart {
        bars: Vec::new(),
        rejected: Vec::new(),
    };

    let Some(result) = resp.chart.result else {
        return match resp.chart.error {
            Some(err) if err.code == "Not Found" => Ok(empty),
            Some(err) => Err(NormalizeError::malformed(
                provider,
                format!("{}: {}", err.code, err.description),
            )),
            None => Ok(empty),
        };
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(empty);
    };
    let Some(timestamps) = data.timestamp else {
        return Ok(empty);
    };
    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| NormalizeError::malformed(provider, "no quote data"))?;
    let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut rejected = Vec::new();

    for (i, &ts) in timestamps.iter().enumerate() {
        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none()
        {
            continue;
        }

        let Some(date) = session_date(ts, offset) else {
            rejected.push(NormalizeError::malformed(provider, format!("invalid timestamp {ts}")));
            continue;
        };
        let Some(close) = close.filter(|c| c.is_finite()) else {
            rejected.push(NormalizeError::malformed(provider, format!("no close on {date}")));
            continue;
        };

        bars.push(Bar {
            ticker: ticker.to_string(),
            date,
            open: open.unwrap_or(0.0),
            high: high.unwrap_or(0.0),
            low: low.unwrap_or(0.0),
            close,
            volume: volume.filter(|v| v.is_finite()).map(|v| v as i64).unwrap_or(0),
            source: provider.source_tag().to_string(),
        });
    }

    Ok(ParsedChart { bars, rejected })
}

/// Exchange-local calendar date of a bar timestamp.
fn session_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts.checked_add(gmtoffset)?, 0).map(|dt| dt.naive_utc().date())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart(timestamps: Vec<i64>, closes: Vec<Option<f64>>) -> Value {
        let n = timestamps.len();
        json!({
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": -18000},
                    "timestamp": timestamps,
                    "indicators": {"quote": [{
                        "open": vec![Some(100.0); n],
                        "high": vec![Some(101.0); n],
                        "low": vec![Some(99.0); n],
                        "close": closes,
                        "volume": vec![Some(1000); n],
                    }]}
                }],
                "error": null
            }
        })
    }

    #[test]
    fn parses_rows_in_exchange_time() {
        // 2024-01-02 14:30 UTC, US open
        let payload = chart(vec![1_704_205_800], vec![Some(100.5)]);
        let parsed = parse_chart("SPY", &payload).unwrap();
        assert_eq!(parsed.bars.len(), 1);
        let bar = &parsed.bars[0];
        assert_eq!(bar.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bar.close, 100.5);
        assert_eq!(bar.volume, 1000);
        assert_eq!(bar.source, "yfinance");
    }

    #[test]
    fn all_null_rows_are_skipped_silently() {
        let payload = json!({
            "chart": {"result": [{
                "timestamp": [1_704_205_800, 1_704_292_200],
                "indicators": {"quote": [{
                    "open": [null, 100.0], "high": [null, 101.0], "low": [null, 99.0],
                    "close": [null, 100.0], "volume": [null, 500]
                }]}
            }]}
        });
        let parsed = parse_chart("SPY", &payload).unwrap();
        assert_eq!(parsed.bars.len(), 1);
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn row_without_close_is_rejected() {
        let payload = chart(vec![1_704_205_800, 1_704_292_200], vec![None, Some(101.0)]);
        let parsed = parse_chart("SPY", &payload).unwrap();
        assert_eq!(parsed.bars.len(), 1);
        assert_eq!(parsed.rejected.len(), 1);
    }

    #[test]
    fn not_found_is_empty_other_errors_are_malformed() {
        let not_found = json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}});
        assert!(parse_chart("ZZZZ", &not_found).unwrap().bars.is_empty());

        let broken = json!({"chart": {"result": null, "error": {"code": "Bad Request", "description": "x"}}});
        assert!(matches!(
            parse_chart("ZZZZ", &broken),
            Err(NormalizeError::MalformedPayload { .. })
        ));

        assert!(parse_chart("ZZZZ", &json!({"nope": 1})).is_err());
    }
}
