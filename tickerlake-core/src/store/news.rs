//! News: `news_articles`, keyed globally by url. Articles are immutable once
//! captured: a second write of the same url is a no-op.

use rusqlite::{params, Connection, Row};

use super::error::{Result, StoreError};
use super::rows;
use crate::domain::NewsItem;

const TABLE: &str = "news_articles";

const INSERT_IF_ABSENT: &str = "INSERT INTO news_articles (ticker, title, source, url, published_at, content)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
     ON CONFLICT(url) DO NOTHING";

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<NewsItem> {
    Ok(NewsItem {
        ticker: rows::text(row, 0)?,
        title: rows::text(row, 1)?,
        source_name: rows::text(row, 2)?,
        url: rows::text(row, 3)?,
        published_at: rows::text(row, 4)?,
        content: rows::text(row, 5)?,
    })
}

/// Returns the number of articles actually inserted.
pub(crate) fn insert_if_absent(conn: &Connection, items: &[NewsItem]) -> Result<usize> {
    let mut stmt = conn
        .prepare_cached(INSERT_IF_ABSENT)
        .map_err(|e| StoreError::on_write(TABLE, e))?;
    let mut inserted = 0;
    for n in items {
        inserted += stmt
            .execute(params![n.ticker, n.title, n.source_name, n.url, n.published_at, n.content])
            .map_err(|e| StoreError::on_write(TABLE, e))?;
    }
    Ok(inserted)
}

/// Newest first by publication time.
pub(crate) fn recent(conn: &Connection, ticker: &str, limit: usize) -> Result<Vec<NewsItem>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare_cached(
        "SELECT ticker, title, source, url, published_at, content
         FROM news_articles WHERE ticker = ?1
         ORDER BY published_at DESC, id DESC LIMIT ?2",
    )?;
    let items = stmt
        .query_map(params![ticker, limit], news_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}
