//! Explicit optional-field records for each provider payload shape.
//!
//! These mirror what each upstream API returns, field for field, with every
//! value optional. Unknown keys are ignored by serde. Defaulting and required
//! field checks live in [`super::normalize`].

use serde::Deserialize;
use std::collections::BTreeMap;

use super::lenient;

// ── Alpha Vantage ────────────────────────────────────────────────────

/// `TIME_SERIES_DAILY` response: a map of `YYYY-MM-DD` to string-valued bars.
#[derive(Debug, Default, Deserialize)]
pub struct AlphaVantageDaily {
    #[serde(rename = "Time Series (Daily)", default)]
    pub series: BTreeMap<String, AlphaVantageBar>,
    #[serde(rename = "Error Message", default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AlphaVantageBar {
    #[serde(rename = "1. open", default, deserialize_with = "lenient::f64_opt")]
    pub open: Option<f64>,
    #[serde(rename = "2. high", default, deserialize_with = "lenient::f64_opt")]
    pub high: Option<f64>,
    #[serde(rename = "3. low", default, deserialize_with = "lenient::f64_opt")]
    pub low: Option<f64>,
    #[serde(rename = "4. close", default, deserialize_with = "lenient::f64_opt")]
    pub close: Option<f64>,
    #[serde(rename = "5. volume", default, deserialize_with = "lenient::i64_opt")]
    pub volume: Option<i64>,
}

// ── Polygon ──────────────────────────────────────────────────────────

/// Aggregates (`/v2/aggs`) response.
#[derive(Debug, Default, Deserialize)]
pub struct PolygonAggregates {
    #[serde(default)]
    pub results: Vec<PolygonBar>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PolygonBar {
    /// Window start, epoch milliseconds.
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub t: Option<i64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub o: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub h: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub l: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub c: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub v: Option<i64>,
}

// ── Finnhub ──────────────────────────────────────────────────────────

/// `/quote` response.
#[derive(Debug, Default, Deserialize)]
pub struct FinnhubQuote {
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub c: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub d: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub dp: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub h: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub l: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub o: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub pc: Option<f64>,
    /// Quote time, epoch seconds.
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub t: Option<i64>,
}

// ── Financial Modeling Prep ──────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmpProfile {
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub company_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub mkt_cap: Option<f64>,
    #[serde(default, deserialize_with = "lenient::i64_opt")]
    pub full_time_employees: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub ceo: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub website: Option<String>,
    #[serde(default, alias = "exchangeShortName", deserialize_with = "lenient::string_opt")]
    pub exchange: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub ipo_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmpRatios {
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price_earnings_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub price_to_book_ratio: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub dividend_yield: Option<f64>,
    #[serde(default, alias = "debtEquityRatio", deserialize_with = "lenient::f64_opt")]
    pub debt_to_equity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub return_on_assets: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub return_on_equity: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub gross_profit_margin: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub operating_profit_margin: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub net_profit_margin: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FmpIncomeStatement {
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub period: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub revenue: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub net_income: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub eps: Option<f64>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub free_cash_flow: Option<f64>,
}

// ── News API ─────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct NewsApiResponse {
    #[serde(default)]
    pub articles: Vec<NewsArticle>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<NewsArticleSource>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub published_at: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsArticleSource {
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub name: Option<String>,
}

// ── Manual ticker info ───────────────────────────────────────────────

/// One entry of the tickers file. Keys are the file's own (Spanish) names.
#[derive(Debug, Default, Deserialize)]
pub struct ManualTickerInfo {
    #[serde(default, alias = "ticker", deserialize_with = "lenient::string_opt")]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub subsector: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub pais: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub fundacion: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub anos_en_bolsa: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub tipo: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_opt")]
    pub resena: Option<String>,
}
