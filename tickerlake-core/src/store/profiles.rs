//! Profiles: `company_profiles`, keyed by (ticker, source). Last write wins
//! within a source.

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{Result, StoreError};
use super::rows;
use crate::domain::Profile;

const TABLE: &str = "company_profiles";

const UPSERT: &str = "INSERT INTO company_profiles
        (ticker, company_name, industry, sector, subsector, market_cap, employees, description,
         ceo, website, exchange, ipo_date, country, founded, years_public, type, source)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
     ON CONFLICT(ticker, source) DO UPDATE SET
        company_name = excluded.company_name,
        industry = excluded.industry,
        sector = excluded.sector,
        subsector = excluded.subsector,
        market_cap = excluded.market_cap,
        employees = excluded.employees,
        description = excluded.description,
        ceo = excluded.ceo,
        website = excluded.website,
        exchange = excluded.exchange,
        ipo_date = excluded.ipo_date,
        country = excluded.country,
        founded = excluded.founded,
        years_public = excluded.years_public,
        type = excluded.type,
        timestamp = CURRENT_TIMESTAMP";

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        ticker: rows::text(row, 0)?,
        company_name: rows::text(row, 1)?,
        industry: rows::text(row, 2)?,
        sector: rows::text(row, 3)?,
        subsector: rows::text(row, 4)?,
        market_cap: rows::real_opt(row, 5)?.unwrap_or(0.0),
        employees: rows::int(row, 6)?,
        description: rows::text(row, 7)?,
        ceo: rows::text(row, 8)?,
        website: rows::text(row, 9)?,
        exchange: rows::text(row, 10)?,
        ipo_date: rows::text(row, 11)?,
        country: rows::text(row, 12)?,
        founded: rows::text(row, 13)?,
        years_public: rows::text(row, 14)?,
        profile_type: rows::text(row, 15)?,
        source: rows::text(row, 16)?,
    })
}

pub(crate) fn upsert(conn: &Connection, profiles: &[Profile]) -> Result<usize> {
    let mut stmt = conn.prepare_cached(UPSERT).map_err(|e| StoreError::on_write(TABLE, e))?;
    let mut written = 0;
    for p in profiles {
        written += stmt
            .execute(params![
                p.ticker,
                p.company_name,
                p.industry,
                p.sector,
                p.subsector,
                p.market_cap,
                p.employees,
                p.description,
                p.ceo,
                p.website,
                p.exchange,
                p.ipo_date,
                p.country,
                p.founded,
                p.years_public,
                p.profile_type,
                p.source
            ])
            .map_err(|e| StoreError::on_write(TABLE, e))?;
    }
    Ok(written)
}

/// Most recently captured profile for `ticker` across all sources.
pub(crate) fn latest(conn: &Connection, ticker: &str) -> Result<Option<Profile>> {
    let profile = conn
        .query_row(
            "SELECT ticker, company_name, industry, sector, subsector, market_cap, employees, description,
                    ceo, website, exchange, ipo_date, country, founded, years_public, type, source
             FROM company_profiles WHERE ticker = ?1
             ORDER BY timestamp DESC, id DESC LIMIT 1",
            [ticker],
            profile_from_row,
        )
        .optional()?;
    Ok(profile)
}
