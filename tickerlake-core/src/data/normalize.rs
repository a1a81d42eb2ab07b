//! Record Normalizer: provider payload → canonical records.
//!
//! Pure: no storage, no clock. The caller passes the capture time used for
//! quotes that carry no timestamp of their own.
//!
//! Defaulting rules, applied here and nowhere else:
//! - an absent numeric field becomes `0` (`0.0` for prices)
//! - an absent text field becomes `""`
//! - fundamentals are the exception: an absent figure stays `None`, which the
//!   store reads as "leave the stored value alone"
//!
//! Required fields (a record missing one is rejected, the rest still load):
//! - Bar: a parseable date and a close
//! - Quote: the current price
//! - NewsItem: a non-empty URL
//! - FundamentalPeriod: a parseable period end date

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::payloads::{
    AlphaVantageDaily, FinnhubQuote, FmpIncomeStatement, FmpProfile, FmpRatios, ManualTickerInfo,
    NewsApiResponse, PolygonAggregates,
};
use super::provider::{NormalizeError, Provider};
use super::yahoo;
use crate::domain::{
    normalize_ticker, Bar, FundamentalPeriod, NewsItem, Profile, Quote, Record,
};

/// Default number of news articles kept per payload.
pub const DEFAULT_NEWS_LIMIT: usize = 10;
/// Default number of fundamental periods kept per payload.
pub const DEFAULT_FUNDAMENTAL_PERIODS: usize = 4;

fn num(v: Option<f64>) -> f64 {
    v.unwrap_or(0.0)
}

fn int(v: Option<i64>) -> i64 {
    v.unwrap_or(0)
}

fn text(v: Option<String>) -> String {
    v.unwrap_or_default()
}

/// Output of one normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub provider: Provider,
    pub ticker: String,
    pub records: Vec<Record>,
    /// Records skipped for missing required fields.
    pub rejected: Vec<NormalizeError>,
}

impl Normalized {
    /// True when the provider had nothing for this ticker.
    pub fn is_no_data(&self) -> bool {
        self.records.is_empty() && self.rejected.is_empty()
    }
}

/// Converts provider payloads into canonical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    pub news_limit: usize,
    pub fundamental_periods: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            news_limit: DEFAULT_NEWS_LIMIT,
            fundamental_periods: DEFAULT_FUNDAMENTAL_PERIODS,
        }
    }
}

impl Normalizer {
    pub fn new(news_limit: usize, fundamental_periods: usize) -> Self {
        Self {
            news_limit,
            fundamental_periods,
        }
    }

    /// Normalize one payload declared as coming from `provider` for `ticker`.
    ///
    /// An empty payload (`null`, `{}`, `[]`) yields zero records. A payload
    /// whose overall shape does not match the provider is `MalformedPayload`.
    pub fn normalize(
        &self,
        provider: Provider,
        ticker: &str,
        payload: &Value,
        captured_at: NaiveDateTime,
    ) -> Result<Normalized, NormalizeError> {
        let ticker =
            normalize_ticker(ticker).ok_or_else(|| NormalizeError::InvalidTicker(ticker.to_string()))?;

        let mut out = Normalized {
            provider,
            ticker: ticker.clone(),
            records: Vec::new(),
            rejected: Vec::new(),
        };
        if is_empty_payload(payload) {
            return Ok(out);
        }

        match provider {
            Provider::YahooChart => {
                let parsed = yahoo::parse_chart(&ticker, payload)?;
                out.records.extend(parsed.bars.into_iter().map(Record::Bar));
                out.rejected.extend(parsed.rejected);
            }
            Provider::AlphavantageDaily => self.alphavantage(&ticker, payload, &mut out)?,
            Provider::PolygonAggregates => self.polygon(&ticker, payload, &mut out)?,
            Provider::FinnhubQuote => self.finnhub(&ticker, payload, captured_at, &mut out)?,
            Provider::FmpProfile => self.fmp_profile(&ticker, payload, &mut out)?,
            Provider::FmpRatios => self.fmp_ratios(&ticker, payload, &mut out)?,
            Provider::FmpIncomeStatement => self.fmp_income(&ticker, payload, &mut out)?,
            Provider::Newsapi => self.news(&ticker, payload, &mut out)?,
            Provider::ManualTickerInfo => self.manual(&ticker, payload, &mut out)?,
        }

        debug!(
            provider = %provider,
            ticker = %out.ticker,
            records = out.records.len(),
            rejected = out.rejected.len(),
            "normalized payload"
        );
        Ok(out)
    }

    fn alphavantage(&self, ticker: &str, payload: &Value, out: &mut Normalized) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let parsed: AlphaVantageDaily = decode(provider, payload)?;
        if parsed.series.is_empty() {
            if let Some(message) = parsed.error_message {
                return Err(NormalizeError::malformed(provider, message));
            }
        }
        for (day, row) in parsed.series {
            let Some(date) = parse_date(&day) else {
                out.rejected.push(NormalizeError::malformed(provider, format!("bad date {day:?}")));
                continue;
            };
            let Some(close) = row.close else {
                out.rejected.push(NormalizeError::malformed(provider, format!("no close on {date}")));
                continue;
            };
            out.records.push(Record::Bar(Bar {
                ticker: ticker.to_string(),
                date,
                open: num(row.open),
                high: num(row.high),
                low: num(row.low),
                close,
                volume: int(row.volume),
                source: provider.source_tag().to_string(),
            }));
        }
        Ok(())
    }

    fn polygon(&self, ticker: &str, payload: &Value, out: &mut Normalized) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let parsed: PolygonAggregates = decode(provider, payload)?;
        for row in parsed.results {
            let Some(date) = row.t.and_then(|ms| DateTime::from_timestamp_millis(ms)).map(|dt| dt.date_naive())
            else {
                out.rejected.push(NormalizeError::malformed(provider, "missing or invalid t"));
                continue;
            };
            let Some(close) = row.c else {
                out.rejected.push(NormalizeError::malformed(provider, format!("no close on {date}")));
                continue;
            };
            out.records.push(Record::Bar(Bar {
                ticker: ticker.to_string(),
                date,
                open: num(row.o),
                high: num(row.h),
                low: num(row.l),
                close,
                volume: int(row.v),
                source: provider.source_tag().to_string(),
            }));
        }
        Ok(())
    }

    fn finnhub(
        &self,
        ticker: &str,
        payload: &Value,
        captured_at: NaiveDateTime,
        out: &mut Normalized,
    ) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let q: FinnhubQuote = decode(provider, payload)?;
        let Some(current) = q.c else {
            out.rejected.push(NormalizeError::malformed(provider, "no current price"));
            return Ok(());
        };
        let quoted_at = q
            .t
            .filter(|&t| t > 0)
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .map(|dt| dt.naive_utc())
            .unwrap_or(captured_at);
        out.records.push(Record::Quote(Quote {
            ticker: ticker.to_string(),
            quoted_at,
            current,
            change: num(q.d),
            percent_change: num(q.dp),
            high: num(q.h),
            low: num(q.l),
            open: num(q.o),
            previous_close: num(q.pc),
            source: provider.source_tag().to_string(),
        }));
        Ok(())
    }

    fn fmp_profile(&self, ticker: &str, payload: &Value, out: &mut Normalized) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let Some(p) = decode_list::<FmpProfile>(provider, payload)?.into_iter().next() else {
            return Ok(());
        };
        out.records.push(Record::Profile(Profile {
            ticker: ticker.to_string(),
            company_name: text(p.company_name),
            industry: text(p.industry),
            sector: text(p.sector),
            subsector: String::new(),
            market_cap: num(p.mkt_cap),
            employees: int(p.full_time_employees),
            description: text(p.description),
            ceo: text(p.ceo),
            website: text(p.website),
            exchange: text(p.exchange),
            ipo_date: text(p.ipo_date),
            country: text(p.country),
            founded: String::new(),
            years_public: String::new(),
            profile_type: String::new(),
            source: provider.source_tag().to_string(),
        }));
        Ok(())
    }

    fn fmp_ratios(&self, ticker: &str, payload: &Value, out: &mut Normalized) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let rows: Vec<FmpRatios> = decode_list(provider, payload)?;
        for r in rows.into_iter().take(self.fundamental_periods) {
            let Some(period_end_date) = r.date.as_deref().and_then(parse_date) else {
                out.rejected.push(NormalizeError::malformed(provider, "missing period end date"));
                continue;
            };
            out.records.push(Record::Fundamental(FundamentalPeriod {
                ticker: ticker.to_string(),
                period: text(r.period),
                period_end_date,
                pe_ratio: Some(num(r.price_earnings_ratio)),
                pb_ratio: Some(num(r.price_to_book_ratio)),
                dividend_yield: Some(num(r.dividend_yield)),
                debt_to_equity: Some(num(r.debt_to_equity)),
                roa: Some(num(r.return_on_assets)),
                roe: Some(num(r.return_on_equity)),
                gross_margin: Some(num(r.gross_profit_margin)),
                operating_margin: Some(num(r.operating_profit_margin)),
                net_margin: Some(num(r.net_profit_margin)),
                data_source: provider.source_tag().to_string(),
                ..Default::default()
            }));
        }
        Ok(())
    }

    fn fmp_income(&self, ticker: &str, payload: &Value, out: &mut Normalized) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let rows: Vec<FmpIncomeStatement> = decode_list(provider, payload)?;
        for r in rows.into_iter().take(self.fundamental_periods) {
            let Some(period_end_date) = r.date.as_deref().and_then(parse_date) else {
                out.rejected.push(NormalizeError::malformed(provider, "missing period end date"));
                continue;
            };
            out.records.push(Record::Fundamental(FundamentalPeriod {
                ticker: ticker.to_string(),
                period: text(r.period),
                period_end_date,
                revenue: Some(num(r.revenue)),
                net_income: Some(num(r.net_income)),
                eps: Some(num(r.eps)),
                free_cash_flow: Some(num(r.free_cash_flow)),
                data_source: provider.source_tag().to_string(),
                ..Default::default()
            }));
        }
        Ok(())
    }

    fn news(&self, ticker: &str, payload: &Value, out: &mut Normalized) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let parsed: NewsApiResponse = decode(provider, payload)?;
        for article in parsed.articles.into_iter().take(self.news_limit) {
            let Some(url) = article.url else {
                out.rejected.push(NormalizeError::malformed(provider, "article without url"));
                continue;
            };
            out.records.push(Record::News(NewsItem {
                ticker: ticker.to_string(),
                title: text(article.title),
                source_name: text(article.source.and_then(|s| s.name)),
                url,
                published_at: text(article.published_at),
                content: text(article.content),
            }));
        }
        Ok(())
    }

    fn manual(&self, ticker: &str, payload: &Value, out: &mut Normalized) -> Result<(), NormalizeError> {
        let provider = out.provider;
        let info: ManualTickerInfo = decode(provider, payload)?;
        // An entry may name its own symbol; the declared ticker wins when it does not.
        let ticker = info
            .symbol
            .as_deref()
            .and_then(normalize_ticker)
            .unwrap_or_else(|| ticker.to_string());
        out.ticker = ticker.clone();
        out.records.push(Record::Profile(Profile {
            ticker,
            sector: text(info.sector),
            subsector: text(info.subsector),
            description: text(info.resena),
            country: text(info.pais),
            founded: text(info.fundacion),
            years_public: text(info.anos_en_bolsa),
            profile_type: text(info.tipo),
            source: provider.source_tag().to_string(),
            ..Default::default()
        }));
        Ok(())
    }
}

fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn decode<T: DeserializeOwned>(provider: Provider, payload: &Value) -> Result<T, NormalizeError> {
    serde_json::from_value(payload.clone()).map_err(|e| NormalizeError::malformed(provider, e.to_string()))
}

/// FMP returns a JSON array; a bare object is accepted as a one-element list.
fn decode_list<T: DeserializeOwned>(provider: Provider, payload: &Value) -> Result<Vec<T>, NormalizeError> {
    match payload {
        Value::Array(_) => decode(provider, payload),
        Value::Object(_) => Ok(vec![decode(provider, payload)?]),
        _ => Err(NormalizeError::malformed(provider, "expected a list")),
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
