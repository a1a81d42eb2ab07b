//! Indicator rows: `technical_indicators`, keyed by (ticker, date).
//!
//! Rows are fully derived, so an upsert overwrites every column, absent
//! values included.

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use super::error::{Result, StoreError};
use super::rows;
use crate::domain::IndicatorRow;

const TABLE: &str = "technical_indicators";

const UPSERT: &str = "INSERT INTO technical_indicators
        (ticker, date, sma_20, sma_50, sma_200, ema_12, ema_26, macd, macd_signal, macd_histogram,
         rsi_14, bollinger_upper, bollinger_middle, bollinger_lower, atr_14, derived_from)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
     ON CONFLICT(ticker, date) DO UPDATE SET
        sma_20 = excluded.sma_20,
        sma_50 = excluded.sma_50,
        sma_200 = excluded.sma_200,
        ema_12 = excluded.ema_12,
        ema_26 = excluded.ema_26,
        macd = excluded.macd,
        macd_signal = excluded.macd_signal,
        macd_histogram = excluded.macd_histogram,
        rsi_14 = excluded.rsi_14,
        bollinger_upper = excluded.bollinger_upper,
        bollinger_middle = excluded.bollinger_middle,
        bollinger_lower = excluded.bollinger_lower,
        atr_14 = excluded.atr_14,
        derived_from = excluded.derived_from,
        timestamp = CURRENT_TIMESTAMP";

fn row_from_sql(row: &Row<'_>) -> rusqlite::Result<IndicatorRow> {
    Ok(IndicatorRow {
        ticker: rows::text(row, 0)?,
        date: rows::date(row, 1)?,
        sma_20: rows::real_opt(row, 2)?,
        sma_50: rows::real_opt(row, 3)?,
        sma_200: rows::real_opt(row, 4)?,
        ema_12: rows::real_opt(row, 5)?,
        ema_26: rows::real_opt(row, 6)?,
        macd: rows::real_opt(row, 7)?,
        macd_signal: rows::real_opt(row, 8)?,
        macd_histogram: rows::real_opt(row, 9)?,
        rsi_14: rows::real_opt(row, 10)?,
        bollinger_upper: rows::real_opt(row, 11)?,
        bollinger_middle: rows::real_opt(row, 12)?,
        bollinger_lower: rows::real_opt(row, 13)?,
        atr_14: rows::real_opt(row, 14)?,
        derived_from: rows::text(row, 15)?,
    })
}

pub(crate) fn upsert(conn: &Connection, batch: &[IndicatorRow]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(UPSERT).map_err(|e| StoreError::on_write(TABLE, e))?;
    let mut written = 0;
    for r in batch {
        written += stmt
            .execute(params![
                r.ticker,
                r.date,
                r.sma_20,
                r.sma_50,
                r.sma_200,
                r.ema_12,
                r.ema_26,
                r.macd,
                r.macd_signal,
                r.macd_histogram,
                r.rsi_14,
                r.bollinger_upper,
                r.bollinger_middle,
                r.bollinger_lower,
                r.atr_14,
                r.derived_from
            ])
            .map_err(|e| StoreError::on_write(TABLE, e))?;
    }
    Ok(written)
}

/// Rows with `start <= date <= end`, ascending.
pub(crate) fn between(conn: &Connection, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<IndicatorRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT ticker, date, sma_20, sma_50, sma_200, ema_12, ema_26, macd, macd_signal, macd_histogram,
                rsi_14, bollinger_upper, bollinger_middle, bollinger_lower, atr_14, derived_from
         FROM technical_indicators
         WHERE ticker = ?1 AND date >= ?2 AND date < ?3
         ORDER BY date ASC",
    )?;
    let after_end = end.succ_opt().unwrap_or(end);
    let found = stmt
        .query_map(params![ticker, start, after_end], row_from_sql)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(found)
}
