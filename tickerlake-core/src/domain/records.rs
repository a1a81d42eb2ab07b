//! Canonical non-bar records: quotes, profiles, news and fundamentals.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Bar;

/// Point-in-time price snapshot. Key: (ticker, quoted_at, source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    pub quoted_at: NaiveDateTime,
    pub current: f64,
    pub change: f64,
    pub percent_change: f64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub previous_close: f64,
    pub source: String,
}

/// Company metadata as one source describes it. Key: (ticker, source).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub ticker: String,
    pub company_name: String,
    pub industry: String,
    pub sector: String,
    pub subsector: String,
    pub market_cap: f64,
    pub employees: i64,
    pub description: String,
    pub ceo: String,
    pub website: String,
    pub exchange: String,
    pub ipo_date: String,
    pub country: String,
    pub founded: String,
    pub years_public: String,
    pub profile_type: String,
    pub source: String,
}

/// A news article. Key: url, globally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub ticker: String,
    pub title: String,
    pub source_name: String,
    pub url: String,
    pub published_at: String,
    pub content: String,
}

/// Financial figures for one reporting period. Key: (ticker, period, period_end_date).
///
/// Fields are optional because each upstream endpoint supplies only its own
/// group; `None` means "not specified by this write", and the store keeps
/// whatever value it already has for that column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalPeriod {
    pub ticker: String,
    pub period: String,
    pub period_end_date: NaiveDate,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub eps: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub roa: Option<f64>,
    pub roe: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub data_source: String,
}

/// Which entity table a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Bars,
    Quotes,
    Profiles,
    News,
    Fundamentals,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Bars => "bars",
            EntityKind::Quotes => "quotes",
            EntityKind::Profiles => "profiles",
            EntityKind::News => "news",
            EntityKind::Fundamentals => "fundamentals",
        }
    }
}

/// Any canonical record the normalizer can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Bar(Bar),
    Quote(Quote),
    Profile(Profile),
    News(NewsItem),
    Fundamental(FundamentalPeriod),
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Bar(_) => EntityKind::Bars,
            Record::Quote(_) => EntityKind::Quotes,
            Record::Profile(_) => EntityKind::Profiles,
            Record::News(_) => EntityKind::News,
            Record::Fundamental(_) => EntityKind::Fundamentals,
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            Record::Bar(b) => &b.ticker,
            Record::Quote(q) => &q.ticker,
            Record::Profile(p) => &p.ticker,
            Record::News(n) => &n.ticker,
            Record::Fundamental(f) => &f.ticker,
        }
    }
}

/// Records of one normalization grouped by entity, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBatch {
    pub bars: Vec<Bar>,
    pub quotes: Vec<Quote>,
    pub profiles: Vec<Profile>,
    pub news: Vec<NewsItem>,
    pub fundamentals: Vec<FundamentalPeriod>,
}

impl RecordBatch {
    pub fn len(&self) -> usize {
        self.bars.len()
            + self.quotes.len()
            + self.profiles.len()
            + self.news.len()
            + self.fundamentals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Record> for RecordBatch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut batch = RecordBatch::default();
        for record in iter {
            match record {
                Record::Bar(b) => batch.bars.push(b),
                Record::Quote(q) => batch.quotes.push(q),
                Record::Profile(p) => batch.profiles.push(p),
                Record::News(n) => batch.news.push(n),
                Record::Fundamental(f) => batch.fundamentals.push(f),
            }
        }
        batch
    }
}
