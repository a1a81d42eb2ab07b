//! Conflation Store: durable, source-tagged upserts over SQLite.
//!
//! One `rusqlite::Connection` guarded by a `parking_lot::Mutex`. Every public
//! write runs in its own transaction, so a batch of records for one ticker
//! either lands completely or not at all, and nothing spans more than one
//! ticker. Tickers passed to reads and writes are normalized here too.

mod bars;
mod error;
mod fundamentals;
mod indicators;
mod maintenance;
mod migrations;
mod news;
mod profiles;
mod quotes;
mod rows;

pub use bars::{ReplaceOutcome, SourceSelector};
pub use error::{Result, StoreError};
pub use maintenance::{DedupReport, LegacyCopy, LegacyMigrationReport, LegacyTable, LEGACY_TABLES};
pub use migrations::CANONICAL_TABLES;

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::domain::{
    canonical_or_empty, Bar, DateWindow, FundamentalPeriod, IndicatorRow, NewsItem, Profile, Quote,
};

/// Read access to stored bar series, one source at a time.
///
/// The indicator engine and the returns calculator depend on this rather
/// than on [`Store`] so that lookups can be substituted in tests.
pub trait BarHistory {
    /// Bars for `ticker` from `source` inside `window`, ascending by date.
    fn bars_between(&self, ticker: &str, source: &str, window: DateWindow) -> Result<Vec<Bar>>;
}

/// SQLite-backed conflation store.
pub struct Store {
    conn: Mutex<Connection>,
    location: String,
}

impl Store {
    /// Open (creating if needed) a database file and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        let location = path.display().to_string();
        let unavailable = |reason: String| StoreError::Unavailable {
            location: location.clone(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| unavailable(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| unavailable(e.to_string()))?;

        Self::init(conn, location.clone())
    }

    /// Fresh in-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Unavailable {
            location: ":memory:".into(),
            reason: e.to_string(),
        })?;
        Self::init(conn, ":memory:".into())
    }

    /// Wrap an existing connection, running migrations on it.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let location = conn.path().unwrap_or(":memory:").to_string();
        Self::init(conn, location)
    }

    fn init(conn: Connection, location: String) -> Result<Self> {
        let unindexed = migrations::run_migrations(&conn).map_err(|e| StoreError::Unavailable {
            location: location.clone(),
            reason: format!("schema migration failed: {e}"),
        })?;
        if !unindexed.is_empty() {
            warn!(tables = ?unindexed, "tables hold duplicate keys; upserts into them fail until dedupe runs");
        }
        info!(location = %location, "store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    // ========== Writes ==========

    /// Upsert bars for `ticker`; each bar keeps its own source.
    /// Returns the number of rows inserted or replaced.
    pub fn upsert_bars(&self, ticker: &str, bars: &[Bar]) -> Result<usize> {
        let ticker = canonical_or_empty(ticker);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let written = bars::upsert(&tx, &ticker, bars)?;
        tx.commit()?;
        debug!(ticker = %ticker, written, "upserted bars");
        Ok(written)
    }

    /// Full refresh of one (ticker, source) series: the old series is deleted
    /// and `bars` written in its place, atomically.
    ///
    /// An empty `bars` leaves the stored series untouched, so a failed or empty
    /// fetch never wipes existing data.
    pub fn replace_bars(&self, ticker: &str, source: &str, bars: &[Bar]) -> Result<ReplaceOutcome> {
        if bars.is_empty() {
            debug!(ticker, source, "empty replacement; keeping stored series");
            return Ok(ReplaceOutcome::default());
        }
        let ticker = canonical_or_empty(ticker);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let outcome = bars::replace(&tx, &ticker, source, bars)?;
        tx.commit()?;
        info!(ticker = %ticker, source, removed = outcome.removed, written = outcome.written, "replaced bar series");
        Ok(outcome)
    }

    pub fn upsert_quotes(&self, quotes: &[Quote]) -> Result<usize> {
        let quotes = with_canonical_tickers(quotes, |q| &mut q.ticker);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let written = quotes::upsert(&tx, &quotes)?;
        tx.commit()?;
        Ok(written)
    }

    pub fn upsert_profiles(&self, profiles: &[Profile]) -> Result<usize> {
        let profiles = with_canonical_tickers(profiles, |p| &mut p.ticker);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let written = profiles::upsert(&tx, &profiles)?;
        tx.commit()?;
        Ok(written)
    }

    /// Insert articles whose url is not stored yet. Returns how many were new.
    pub fn upsert_news(&self, items: &[NewsItem]) -> Result<usize> {
        let items = with_canonical_tickers(items, |n| &mut n.ticker);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let inserted = news::insert_if_absent(&tx, &items)?;
        tx.commit()?;
        Ok(inserted)
    }

    /// Merge fundamentals into their period rows.
    pub fn upsert_fundamentals(&self, periods: &[FundamentalPeriod]) -> Result<usize> {
        let periods = with_canonical_tickers(periods, |f| &mut f.ticker);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let written = fundamentals::merge(&tx, &periods)?;
        tx.commit()?;
        Ok(written)
    }

    pub fn upsert_indicator_rows(&self, rows: &[IndicatorRow]) -> Result<usize> {
        let rows = with_canonical_tickers(rows, |r| &mut r.ticker);
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let written = indicators::upsert(&tx, &rows)?;
        tx.commit()?;
        Ok(written)
    }

    // ========== Maintenance ==========

    /// Remove all but the lowest-id row per key group in every canonical
    /// table, then create any missing unique indexes.
    pub fn deduplicate(&self) -> Result<DedupReport> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let report = maintenance::deduplicate(&tx)?;
        tx.commit()?;
        info!(removed = report.total(), "deduplication finished");
        Ok(report)
    }

    /// Copy legacy tables forward into the canonical tables.
    pub fn migrate_legacy(&self) -> Result<LegacyMigrationReport> {
        let conn = self.conn.lock();
        maintenance::migrate_legacy(&conn)
    }

    /// Drop the legacy tables. Returns the tables that existed.
    pub fn drop_legacy_tables(&self) -> Result<Vec<&'static str>> {
        let conn = self.conn.lock();
        maintenance::drop_legacy_tables(&conn)
    }

    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        let conn = self.conn.lock();
        maintenance::table_counts(&conn)
    }

    // ========== Reads ==========

    /// The latest `limit` bars for one source or merged across sources,
    /// ascending by (date, source).
    pub fn latest_bars(&self, ticker: &str, selector: &SourceSelector, limit: usize) -> Result<Vec<Bar>> {
        let conn = self.conn.lock();
        bars::latest(&conn, &canonical_or_empty(ticker), selector, limit)
    }

    pub fn tickers_with_bars(&self, source: Option<&str>) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        bars::tickers(&conn, source)
    }

    pub fn bar_sources(&self, ticker: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        bars::sources(&conn, &canonical_or_empty(ticker))
    }

    pub fn indicator_rows(&self, ticker: &str, window: DateWindow) -> Result<Vec<IndicatorRow>> {
        let conn = self.conn.lock();
        indicators::between(&conn, &canonical_or_empty(ticker), window.start, window.end)
    }

    pub fn latest_profile(&self, ticker: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock();
        profiles::latest(&conn, &canonical_or_empty(ticker))
    }

    pub fn latest_quote(&self, ticker: &str) -> Result<Option<Quote>> {
        let conn = self.conn.lock();
        quotes::latest(&conn, &canonical_or_empty(ticker))
    }

    pub fn recent_news(&self, ticker: &str, limit: usize) -> Result<Vec<NewsItem>> {
        let conn = self.conn.lock();
        news::recent(&conn, &canonical_or_empty(ticker), limit)
    }

    /// The latest `limit` fundamental periods, newest first.
    pub fn fundamentals(&self, ticker: &str, limit: usize) -> Result<Vec<FundamentalPeriod>> {
        let conn = self.conn.lock();
        fundamentals::latest(&conn, &canonical_or_empty(ticker), limit)
    }
}

impl BarHistory for Store {
    fn bars_between(&self, ticker: &str, source: &str, window: DateWindow) -> Result<Vec<Bar>> {
        let conn = self.conn.lock();
        bars::between(&conn, &canonical_or_empty(ticker), source, window.start, window.end)
    }
}

/// Clone `records` with every ticker in canonical form.
fn with_canonical_tickers<T: Clone>(records: &[T], ticker: impl Fn(&mut T) -> &mut String) -> Vec<T> {
    records
        .iter()
        .cloned()
        .map(|mut r| {
            let t = ticker(&mut r);
            *t = canonical_or_empty(t);
            r
        })
        .collect()
}
