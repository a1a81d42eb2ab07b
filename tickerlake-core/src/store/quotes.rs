//! Quotes: `market_quotes`, keyed by (ticker, timestamp, source).

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{Result, StoreError};
use super::rows;
use crate::domain::Quote;

const TABLE: &str = "market_quotes";

const UPSERT: &str = "INSERT INTO market_quotes
        (ticker, current_price, change, percent_change, high, low, open, previous_close, source, timestamp)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
     ON CONFLICT(ticker, timestamp, source) DO UPDATE SET
        current_price = excluded.current_price,
        change = excluded.change,
        percent_change = excluded.percent_change,
        high = excluded.high,
        low = excluded.low,
        open = excluded.open,
        previous_close = excluded.previous_close";

fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<Quote> {
    Ok(Quote {
        ticker: rows::text(row, 0)?,
        current: rows::price(row, 1)?,
        change: rows::real_opt(row, 2)?.unwrap_or(0.0),
        percent_change: rows::real_opt(row, 3)?.unwrap_or(0.0),
        high: rows::price(row, 4)?,
        low: rows::price(row, 5)?,
        open: rows::price(row, 6)?,
        previous_close: rows::price(row, 7)?,
        source: rows::text(row, 8)?,
        quoted_at: rows::datetime(row, 9)?,
    })
}

pub(crate) fn upsert(conn: &Connection, quotes: &[Quote]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(UPSERT).map_err(|e| StoreError::on_write(TABLE, e))?;
    let mut written = 0;
    for q in quotes {
        written += stmt
            .execute(params![
                q.ticker,
                q.current,
                q.change,
                q.percent_change,
                q.high,
                q.low,
                q.open,
                q.previous_close,
                q.source,
                q.quoted_at
            ])
            .map_err(|e| StoreError::on_write(TABLE, e))?;
    }
    Ok(written)
}

/// Most recent quote for `ticker` across all sources.
pub(crate) fn latest(conn: &Connection, ticker: &str) -> Result<Option<Quote>> {
    let quote = conn
        .query_row(
            "SELECT ticker, current_price, change, percent_change, high, low, open, previous_close, source, timestamp
             FROM market_quotes WHERE ticker = ?1
             ORDER BY timestamp DESC, id DESC LIMIT 1",
            [ticker],
            quote_from_row,
        )
        .optional()?;
    Ok(quote)
}
