//! Bars: `stock_daily_data`, keyed by (ticker, date, source).

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};

use super::error::{Result, StoreError};
use super::rows;
use crate::domain::Bar;

const TABLE: &str = "stock_daily_data";

const UPSERT: &str = "INSERT INTO stock_daily_data (ticker, date, open, high, low, close, volume, source)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT(ticker, date, source) DO UPDATE SET
        open = excluded.open,
        high = excluded.high,
        low = excluded.low,
        close = excluded.close,
        volume = excluded.volume,
        timestamp = CURRENT_TIMESTAMP";

const COLUMNS: &str = "ticker, date, open, high, low, close, volume, source";

/// Which sources a bar read covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelector {
    Only(String),
    /// Every source; rows for the same date from different sources are all kept.
    Any,
}

/// Result of a full-refresh replacement of one (ticker, source) series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub removed: usize,
    pub written: usize,
}

fn bar_from_row(row: &Row<'_>) -> rusqlite::Result<Bar> {
    Ok(Bar {
        ticker: rows::text(row, 0)?,
        date: rows::date(row, 1)?,
        open: rows::price(row, 2)?,
        high: rows::price(row, 3)?,
        low: rows::price(row, 4)?,
        close: rows::price(row, 5)?,
        volume: rows::int(row, 6)?,
        source: rows::text(row, 7)?,
    })
}

/// Upsert `bars` under `ticker`, each keeping its own source.
pub(crate) fn upsert(conn: &Connection, ticker: &str, bars: &[Bar]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(UPSERT).map_err(|e| StoreError::on_write(TABLE, e))?;
    let mut written = 0;
    for bar in bars {
        written += stmt
            .execute(params![
                ticker,
                bar.date,
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                bar.source
            ])
            .map_err(|e| StoreError::on_write(TABLE, e))?;
    }
    Ok(written)
}

/// Delete the (ticker, source) series and write `bars` in its place.
///
/// Must run inside a transaction; the caller commits only when both halves
/// succeed, so readers never observe a partially purged series.
pub(crate) fn replace(conn: &Connection, ticker: &str, source: &str, bars: &[Bar]) -> Result<ReplaceOutcome> {
    let removed = conn
        .execute(
            "DELETE FROM stock_daily_data WHERE ticker = ?1 AND source = ?2",
            params![ticker, source],
        )
        .map_err(|e| StoreError::on_write(TABLE, e))?;

    let mut stmt = conn.prepare_cached(UPSERT).map_err(|e| StoreError::on_write(TABLE, e))?;
    let mut written = 0;
    for bar in bars {
        written += stmt
            .execute(params![
                ticker, bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume, source
            ])
            .map_err(|e| StoreError::on_write(TABLE, e))?;
    }
    Ok(ReplaceOutcome { removed, written })
}

/// Bars for one source with `start <= date <= end`, ascending by date.
pub(crate) fn between(
    conn: &Connection,
    ticker: &str,
    source: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Bar>> {
    let mut stmt = conn.prepare_cached(&format!(
        "SELECT {COLUMNS} FROM stock_daily_data
         WHERE ticker = ?1 AND source = ?2 AND date >= ?3 AND date < ?4
         ORDER BY date ASC"
    ))?;
    // Half-open upper bound so dates stored with a time suffix still match `end`.
    let after_end = end.succ_opt().unwrap_or(end);
    let bars = stmt
        .query_map(params![ticker, source, start, after_end], bar_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(bars)
}

/// The most recent `limit` bars, returned ascending by (date, source).
pub(crate) fn latest(conn: &Connection, ticker: &str, selector: &SourceSelector, limit: usize) -> Result<Vec<Bar>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut bars = match selector {
        SourceSelector::Only(source) => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {COLUMNS} FROM stock_daily_data
                 WHERE ticker = ?1 AND source = ?2
                 ORDER BY date DESC LIMIT ?3"
            ))?;
            let rows = stmt.query_map(params![ticker, source, limit], bar_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
        SourceSelector::Any => {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {COLUMNS} FROM stock_daily_data
                 WHERE ticker = ?1
                 ORDER BY date DESC, source DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![ticker, limit], bar_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        }
    };
    bars.reverse();
    Ok(bars)
}

/// Distinct tickers holding at least one bar, optionally from one source.
pub(crate) fn tickers(conn: &Connection, source: Option<&str>) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT ticker FROM stock_daily_data
         WHERE ?1 IS NULL OR source = ?1
         ORDER BY ticker",
    )?;
    let tickers = stmt
        .query_map([source], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tickers)
}

/// Sources holding bars for `ticker`, alphabetically.
pub(crate) fn sources(conn: &Connection, ticker: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(
        "SELECT DISTINCT source FROM stock_daily_data WHERE ticker = ?1 ORDER BY source",
    )?;
    let sources = stmt
        .query_map([ticker], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sources)
}
