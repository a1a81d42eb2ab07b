//! TickerLake CLI: ingestion, maintenance, indicators, returns and export.
//!
//! Commands:
//! - `init`: create or migrate the store schema
//! - `ingest`: run the pipeline over the configured tickers
//! - `migrate-legacy`, `drop-legacy`, `dedupe`: store maintenance
//! - `indicators`: recompute indicator rows
//! - `returns`: trailing YTD / quarter / year returns for one ticker
//! - `show`: latest stored data for one ticker
//! - `export`: bars or indicator rows as CSV
//! - `status`: row counts per table

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use tracing_subscriber::EnvFilter;

use tickerlake_core::domain::{normalize_ticker, DateWindow};
use tickerlake_core::returns::{ReturnWindow, TrailingReturns};
use tickerlake_core::store::{LegacyCopy, SourceSelector, Store};
use tickerlake_runner::{
    BatchRecompute, BatchSummary, EntityOutcome, IndicatorOutcome, JsonDirSource, LogProgress,
    Pipeline, PipelineConfig, UniverseSource,
};

#[derive(Parser)]
#[command(name = "tickerlake", about = "TickerLake: multi-source market data store")]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store path; overrides `[store] path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store and apply pending schema migrations.
    Init,
    /// Normalize payload files and store them, then derive indicators and returns.
    Ingest {
        /// Tickers to process; defaults to the configured universe.
        tickers: Vec<String>,

        /// Payload root; overrides `[ingest] payload_dir`.
        #[arg(long)]
        payload_dir: Option<PathBuf>,

        /// End date for indicator and returns windows (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Print the batch summary as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Copy rows from legacy per-provider tables into the canonical tables.
    MigrateLegacy,
    /// Drop the legacy per-provider tables.
    DropLegacy {
        /// Actually drop (without this flag, only lists what would be dropped).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
    /// Remove duplicate rows and enforce the uniqueness keys.
    Dedupe,
    /// Recompute indicator rows from stored bars.
    Indicators {
        /// Only this ticker; all tickers with bars otherwise.
        #[arg(long)]
        ticker: Option<String>,

        #[arg(long)]
        as_of: Option<String>,

        /// Recompute tickers in parallel; overrides `[indicators] parallel`.
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Print trailing YTD, quarter and year returns.
    Returns {
        ticker: String,

        #[arg(long)]
        as_of: Option<String>,
    },
    /// Show the latest stored data for a ticker.
    Show {
        ticker: String,

        /// Number of bars, indicator rows and news items.
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Export bars or indicator rows as CSV.
    Export {
        ticker: String,

        #[arg(long, value_enum, default_value_t = ExportKind::Bars)]
        kind: ExportKind,

        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Bars from this source only; all sources otherwise.
        #[arg(long)]
        source: Option<String>,

        /// Maximum rows (latest first, written ascending).
        #[arg(long, default_value_t = 500)]
        limit: usize,
    },
    /// Row counts per canonical table.
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ExportKind {
    Bars,
    Indicators,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tickerlake=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref(), cli.db)?;

    match cli.command {
        Commands::Init => run_init(&config),
        Commands::Ingest {
            tickers,
            payload_dir,
            as_of,
            json,
        } => run_ingest(&config, tickers, payload_dir, as_of.as_deref(), json),
        Commands::MigrateLegacy => run_migrate_legacy(&config),
        Commands::DropLegacy { confirm } => run_drop_legacy(&config, confirm),
        Commands::Dedupe => run_dedupe(&config),
        Commands::Indicators {
            ticker,
            as_of,
            parallel,
        } => run_indicators(&config, ticker, as_of.as_deref(), parallel),
        Commands::Returns { ticker, as_of } => run_returns(&config, &ticker, as_of.as_deref()),
        Commands::Show { ticker, limit } => run_show(&config, &ticker, limit),
        Commands::Export {
            ticker,
            kind,
            out,
            source,
            limit,
        } => run_export(&config, &ticker, kind, out, source, limit),
        Commands::Status => run_status(&config),
    }
}

fn load_config(path: Option<&PathBuf>, db: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(db) = db {
        config.store.path = db;
    }
    Ok(config)
}

fn open_store(config: &PipelineConfig) -> Result<Store> {
    Store::open(&config.store.path)
        .with_context(|| format!("opening store {}", config.store.path.display()))
}

fn parse_as_of(as_of: Option<&str>) -> Result<NaiveDate> {
    match as_of {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid --as-of date '{s}'")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn canonical(ticker: &str) -> Result<String> {
    match normalize_ticker(ticker) {
        Some(t) => Ok(t),
        None => bail!("ticker must not be blank"),
    }
}

fn run_init(config: &PipelineConfig) -> Result<()> {
    let store = open_store(config)?;
    println!("Store ready: {}", store.location());
    Ok(())
}

fn run_ingest(
    config: &PipelineConfig,
    tickers: Vec<String>,
    payload_dir: Option<PathBuf>,
    as_of: Option<&str>,
    json: bool,
) -> Result<()> {
    let as_of = parse_as_of(as_of)?;
    let universe = config.universe();
    let tickers = if tickers.is_empty() {
        universe.tickers().to_vec()
    } else {
        tickers
    };
    let payload_dir = payload_dir.unwrap_or_else(|| config.ingest.payload_dir.clone());

    let store = open_store(config)?;
    let source = UniverseSource::new(universe, JsonDirSource::new(payload_dir));
    let cancel = AtomicBool::new(false);

    let summary = Pipeline::new(&store, &source, config)
        .with_as_of(as_of)
        .run(&tickers, &cancel, &LogProgress)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_batch(&summary);
    }
    if summary.failures() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn print_batch(summary: &BatchSummary) {
    println!();
    println!("=== Ingest ===");
    for report in &summary.tickers {
        println!("{}", report.ticker);
        for (provider, outcome) in &report.providers {
            let status = match outcome {
                EntityOutcome::Written { rows, rejected: 0 } => format!("{rows} rows"),
                EntityOutcome::Written { rows, rejected } => format!("{rows} rows ({rejected} skipped)"),
                EntityOutcome::NoData => "no data".to_string(),
                EntityOutcome::Malformed { reason } => format!("malformed: {reason}"),
                EntityOutcome::StoreFailed { reason } => format!("store failed: {reason}"),
            };
            println!("  {:<22} {status}", provider.name());
        }
        println!("  {:<22} {}", "indicators", indicator_status(&report.indicators));
        print_returns_line(&report.returns);
    }
    for skipped in &summary.skipped {
        println!("skipped blank ticker {skipped:?}");
    }
    println!();
    println!(
        "Tickers: {}  Rows: {}  Failures: {}  ({:.1}s){}",
        summary.tickers.len(),
        summary.written(),
        summary.failures(),
        summary.elapsed_secs,
        if summary.cancelled { "  CANCELLED" } else { "" }
    );
}

fn indicator_status(outcome: &IndicatorOutcome) -> String {
    match outcome {
        IndicatorOutcome::Computed { source, rows, digest } => {
            format!("{rows} rows from {source} [{}]", &digest[..digest.len().min(12)])
        }
        IndicatorOutcome::NoBars => "no bars".to_string(),
        IndicatorOutcome::Failed { reason } => format!("failed: {reason}"),
    }
}

fn fmt_return(value: Option<f64>) -> String {
    match value {
        Some(r) => format!("{:.2}%", r * 100.0),
        None => "n/a".to_string(),
    }
}

fn print_returns_line(returns: &TrailingReturns) {
    let parts: Vec<String> = ReturnWindow::ALL
        .iter()
        .map(|&w| format!("{w} {}", fmt_return(returns.get(w))))
        .collect();
    println!("  {:<22} {}", "returns", parts.join("  "));
}

fn run_migrate_legacy(config: &PipelineConfig) -> Result<()> {
    let store = open_store(config)?;
    let report = store.migrate_legacy()?;
    if report.tables.is_empty() {
        println!("No legacy tables present.");
        return Ok(());
    }
    for (table, copy) in &report.tables {
        match copy {
            LegacyCopy::Copied { rows } => println!("{table:<20} {rows} rows copied"),
            LegacyCopy::Failed { reason } => println!("{table:<20} FAILED: {reason}"),
        }
    }
    println!("Copied {} rows, {} table(s) failed.", report.copied(), report.failures());
    if report.failures() > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_drop_legacy(config: &PipelineConfig, confirm: bool) -> Result<()> {
    if !confirm {
        println!("Dry run: pass --confirm to drop the legacy tables.");
        println!("Run `migrate-legacy` first; dropped rows cannot be recovered.");
        return Ok(());
    }
    let store = open_store(config)?;
    let dropped = store.drop_legacy_tables()?;
    if dropped.is_empty() {
        println!("No legacy tables present.");
    }
    for table in dropped {
        println!("Dropped: {table}");
    }
    Ok(())
}

fn run_dedupe(config: &PipelineConfig) -> Result<()> {
    let store = open_store(config)?;
    let report = store.deduplicate()?;
    for (table, removed) in &report.removed {
        println!("{table:<22} {removed} duplicate(s) removed");
    }
    println!("Removed {} row(s).", report.total());
    Ok(())
}

fn run_indicators(
    config: &PipelineConfig,
    ticker: Option<String>,
    as_of: Option<&str>,
    parallel: bool,
) -> Result<()> {
    let as_of = parse_as_of(as_of)?;
    let store = open_store(config)?;
    let batch = BatchRecompute::new(&store, config.indicator_engine(), as_of)
        .with_parallelism(parallel || config.indicators.parallel);
    let cancel = AtomicBool::new(false);

    let summary = match ticker {
        Some(t) => batch.run(&[canonical(&t)?], &cancel)?,
        None => batch.run_all(&cancel)?,
    };
    for t in &summary.tickers {
        println!("{:<8} {}", t.ticker, indicator_status(&t.outcome));
    }
    println!("Rows written: {}  Failures: {}", summary.rows_written(), summary.failures());
    Ok(())
}

fn run_returns(config: &PipelineConfig, ticker: &str, as_of: Option<&str>) -> Result<()> {
    let as_of = parse_as_of(as_of)?;
    let ticker = canonical(ticker)?;
    let store = open_store(config)?;
    let returns = config.returns_calculator().compute(&store, &ticker, as_of);

    println!("{ticker} as of {as_of}");
    for window in ReturnWindow::ALL {
        let source = returns.source(window).unwrap_or("-");
        println!("  {:<8} {:>10}  ({source})", window.as_str(), fmt_return(returns.get(window)));
    }
    Ok(())
}

fn run_show(config: &PipelineConfig, ticker: &str, limit: usize) -> Result<()> {
    let ticker = canonical(ticker)?;
    let store = open_store(config)?;

    println!("=== {ticker} ===");
    match store.latest_profile(&ticker)? {
        Some(p) => {
            let name = if p.company_name.is_empty() { "-" } else { &p.company_name };
            println!("Company:  {name} ({})", p.source);
            println!("Sector:   {} / {}", p.sector, p.industry);
            if p.market_cap > 0.0 {
                println!("Mkt cap:  {:.0}", p.market_cap);
            }
        }
        None => println!("Profile:  no data"),
    }
    match store.latest_quote(&ticker)? {
        Some(q) => println!(
            "Quote:    {:.2} ({:+.2}%) at {} [{}]",
            q.current, q.percent_change, q.quoted_at, q.source
        ),
        None => println!("Quote:    no data"),
    }

    println!();
    println!("Sources:  {}", store.bar_sources(&ticker)?.join(", "));
    let bars = store.latest_bars(&ticker, &SourceSelector::Any, limit)?;
    if bars.is_empty() {
        println!("Bars:     no data");
    } else {
        println!("{:<12} {:>10} {:>10} {:>10} {:>10} {:>12}  source", "date", "open", "high", "low", "close", "volume");
        for b in &bars {
            println!(
                "{:<12} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>12}  {}",
                b.date, b.open, b.high, b.low, b.close, b.volume, b.source
            );
        }
    }

    if let Some(last) = bars.last() {
        let window = DateWindow::trailing_days(last.date, 30);
        let rows = store.indicator_rows(&ticker, window)?;
        let start = rows.len().saturating_sub(limit);
        println!();
        println!("{:<12} {:>10} {:>10} {:>8} {:>10}  from", "date", "sma_20", "macd", "rsi_14", "atr_14");
        for r in &rows[start..] {
            println!(
                "{:<12} {:>10} {:>10} {:>8} {:>10}  {}",
                r.date,
                opt(r.sma_20),
                opt(r.macd),
                opt(r.rsi_14),
                opt(r.atr_14),
                r.derived_from
            );
        }
    }

    let news = store.recent_news(&ticker, limit)?;
    println!();
    if news.is_empty() {
        println!("News:     no data");
    }
    for item in &news {
        println!("- {} ({}) {}", item.title, item.source_name, item.url);
    }

    let periods = store.fundamentals(&ticker, 4)?;
    if !periods.is_empty() {
        println!();
        println!("{:<8} {:<12} {:>16} {:>8} {:>8}", "period", "end", "revenue", "eps", "pe");
        for f in &periods {
            println!(
                "{:<8} {:<12} {:>16} {:>8} {:>8}",
                f.period,
                f.period_end_date,
                opt(f.revenue),
                opt(f.eps),
                opt(f.pe_ratio)
            );
        }
    }
    Ok(())
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

fn run_export(
    config: &PipelineConfig,
    ticker: &str,
    kind: ExportKind,
    out: Option<PathBuf>,
    source: Option<String>,
    limit: usize,
) -> Result<()> {
    let ticker = canonical(ticker)?;
    let store = open_store(config)?;
    let sink: Box<dyn Write> = match &out {
        Some(path) => Box::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(sink);

    let written = match kind {
        ExportKind::Bars => {
            let selector = match source {
                Some(s) => SourceSelector::Only(s),
                None => SourceSelector::Any,
            };
            let bars = store.latest_bars(&ticker, &selector, limit)?;
            for bar in &bars {
                writer.serialize(bar)?;
            }
            bars.len()
        }
        ExportKind::Indicators => {
            let bars = store.latest_bars(&ticker, &SourceSelector::Any, 1)?;
            let Some(last) = bars.last() else {
                bail!("no bars stored for {ticker}");
            };
            let window = DateWindow::trailing_days(last.date, config.indicators.history_days);
            let rows = store.indicator_rows(&ticker, window)?;
            let start = rows.len().saturating_sub(limit);
            for row in &rows[start..] {
                writer.serialize(row)?;
            }
            rows.len() - start
        }
    };
    writer.flush()?;

    if let Some(path) = out {
        eprintln!("Wrote {written} rows to {}", path.display());
    }
    Ok(())
}

fn run_status(config: &PipelineConfig) -> Result<()> {
    let store = open_store(config)?;
    println!("Store: {}", store.location());
    println!();
    println!("{:<24} {:>10}", "table", "rows");
    println!("{}", "-".repeat(35));
    for (table, count) in store.table_counts()? {
        println!("{table:<24} {count:>10}");
    }
    let tickers = store.tickers_with_bars(None)?;
    println!();
    println!("Tickers with bars: {}", tickers.len());
    Ok(())
}
