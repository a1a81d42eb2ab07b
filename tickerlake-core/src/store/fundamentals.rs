//! Fundamentals: `fundamental_data`, keyed by (ticker, period, period_end_date).
//!
//! Not source-keyed. Each write merges into the period row: fields the write
//! specifies overwrite, unspecified (`None`) fields keep their stored value.

use rusqlite::{params, Connection, Row};

use super::error::{Result, StoreError};
use super::rows;
use crate::domain::FundamentalPeriod;

const TABLE: &str = "fundamental_data";

const MERGE: &str = "INSERT INTO fundamental_data
        (ticker, period, period_end_date, revenue, net_income, eps, pe_ratio, pb_ratio, dividend_yield,
         debt_to_equity, roa, roe, gross_margin, operating_margin, net_margin, free_cash_flow, data_source)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
     ON CONFLICT(ticker, period, period_end_date) DO UPDATE SET
        revenue = COALESCE(excluded.revenue, fundamental_data.revenue),
        net_income = COALESCE(excluded.net_income, fundamental_data.net_income),
        eps = COALESCE(excluded.eps, fundamental_data.eps),
        pe_ratio = COALESCE(excluded.pe_ratio, fundamental_data.pe_ratio),
        pb_ratio = COALESCE(excluded.pb_ratio, fundamental_data.pb_ratio),
        dividend_yield = COALESCE(excluded.dividend_yield, fundamental_data.dividend_yield),
        debt_to_equity = COALESCE(excluded.debt_to_equity, fundamental_data.debt_to_equity),
        roa = COALESCE(excluded.roa, fundamental_data.roa),
        roe = COALESCE(excluded.roe, fundamental_data.roe),
        gross_margin = COALESCE(excluded.gross_margin, fundamental_data.gross_margin),
        operating_margin = COALESCE(excluded.operating_margin, fundamental_data.operating_margin),
        net_margin = COALESCE(excluded.net_margin, fundamental_data.net_margin),
        free_cash_flow = COALESCE(excluded.free_cash_flow, fundamental_data.free_cash_flow),
        data_source = COALESCE(excluded.data_source, fundamental_data.data_source),
        timestamp = CURRENT_TIMESTAMP";

fn period_from_row(row: &Row<'_>) -> rusqlite::Result<FundamentalPeriod> {
    Ok(FundamentalPeriod {
        ticker: rows::text(row, 0)?,
        period: rows::text(row, 1)?,
        period_end_date: rows::date(row, 2)?,
        revenue: rows::real_opt(row, 3)?,
        net_income: rows::real_opt(row, 4)?,
        eps: rows::real_opt(row, 5)?,
        pe_ratio: rows::real_opt(row, 6)?,
        pb_ratio: rows::real_opt(row, 7)?,
        dividend_yield: rows::real_opt(row, 8)?,
        debt_to_equity: rows::real_opt(row, 9)?,
        roa: rows::real_opt(row, 10)?,
        roe: rows::real_opt(row, 11)?,
        gross_margin: rows::real_opt(row, 12)?,
        operating_margin: rows::real_opt(row, 13)?,
        net_margin: rows::real_opt(row, 14)?,
        free_cash_flow: rows::real_opt(row, 15)?,
        data_source: rows::text(row, 16)?,
    })
}

pub(crate) fn merge(conn: &Connection, periods: &[FundamentalPeriod]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(MERGE).map_err(|e| StoreError::on_write(TABLE, e))?;
    let mut written = 0;
    for f in periods {
        let data_source = (!f.data_source.is_empty()).then_some(f.data_source.as_str());
        written += stmt
            .execute(params![
                f.ticker,
                f.period,
                f.period_end_date,
                f.revenue,
                f.net_income,
                f.eps,
                f.pe_ratio,
                f.pb_ratio,
                f.dividend_yield,
                f.debt_to_equity,
                f.roa,
                f.roe,
                f.gross_margin,
                f.operating_margin,
                f.net_margin,
                f.free_cash_flow,
                data_source
            ])
            .map_err(|e| StoreError::on_write(TABLE, e))?;
    }
    Ok(written)
}

/// The latest `limit` periods for `ticker`, newest first.
pub(crate) fn latest(conn: &Connection, ticker: &str, limit: usize) -> Result<Vec<FundamentalPeriod>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare_cached(
        "SELECT ticker, period, period_end_date, revenue, net_income, eps, pe_ratio, pb_ratio, dividend_yield,
                debt_to_equity, roa, roe, gross_margin, operating_margin, net_margin, free_cash_flow, data_source
         FROM fundamental_data WHERE ticker = ?1
         ORDER BY period_end_date DESC, period DESC LIMIT ?2",
    )?;
    let periods = stmt
        .query_map(params![ticker, limit], period_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(periods)
}
