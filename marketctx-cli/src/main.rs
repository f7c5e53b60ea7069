//! marketctx CLI: print sections of the market context dashboard.
//!
//! Commands:
//! - `snapshot` — every section plus signals
//! - `news` — latest headlines
//! - `yield` — 10-year Treasury yield with its source
//! - `sectors` — one-day change per sector ETF
//! - `signals` — signal labels and guidance
//! - `config` — print the effective configuration as TOML

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use marketctx_core::dashboard::{HavenAssets, SectorChange, Section};
use marketctx_core::data::{NewsItem, SourcedSeries};
use marketctx_core::signals::SignalReport;
use marketctx_core::{Dashboard, DashboardConfig, DashboardSnapshot};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Points of each series shown in text tables.
const TABLE_ROWS: usize = 10;

#[derive(Parser)]
#[command(
    name = "marketctx",
    about = "Market context for options traders: news, rates, safe havens and sectors"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Every section plus signals.
    Snapshot,
    /// Latest headlines.
    News,
    /// 10-year Treasury yield (FRED, falling back to ^TNX).
    Yield,
    /// One-day change per sector ETF.
    Sectors,
    /// Signal labels and guidance.
    Signals,
    /// Print the effective configuration.
    Config,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    debug!(path = ?cli.config, "configuration loaded");

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let dashboard = Dashboard::new(config).context("building dashboard")?;

    match cli.command {
        Commands::Snapshot => {
            let snapshot = dashboard.snapshot();
            emit(cli.json, &snapshot, print_snapshot)
        }
        Commands::News => emit(cli.json, dashboard.news().as_slice(), print_news),
        Commands::Yield => {
            let section = Section::from(dashboard.ten_year_yield());
            emit(cli.json, &section, print_yield)
        }
        Commands::Sectors => emit(cli.json, &dashboard.sector_changes(), |s| print_sectors(s)),
        Commands::Signals => emit(cli.json, &dashboard.signals(), print_signals),
        Commands::Config => Ok(()),
    }
}

/// Logs go to stderr so `--json` output stays clean on stdout.
fn init_tracing() {
    let log_format = std::env::var("MARKETCTX_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn emit<T: Serialize + ?Sized>(
    json: bool,
    value: &T,
    text: impl Fn(&T) -> Result<()>,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    } else {
        text(value)
    }
}

fn print_snapshot(snapshot: &DashboardSnapshot) -> Result<()> {
    println!("Market context as of {}", snapshot.generated_at.format("%Y-%m-%d %H:%M UTC"));
    println!();
    print_news(&snapshot.news)?;
    println!();
    print_yield(&snapshot.ten_year_yield)?;
    println!();
    print_haven(&snapshot.haven)?;
    println!();
    match &snapshot.sectors {
        Section::Ready(changes) => print_sectors(changes)?,
        Section::Unavailable { reason } => println!("Sectors: {reason}"),
    }
    println!();
    print_signals(&snapshot.signals)
}

fn print_news(items: &[NewsItem]) -> Result<()> {
    println!("Latest market news");
    for item in items {
        let published = if item.published.is_empty() {
            String::new()
        } else {
            format!(" ({})", item.published)
        };
        println!("  - {}{published}", item.title);
        if !item.link.is_empty() {
            println!("    {}", item.link);
        }
    }
    Ok(())
}

fn print_yield(section: &Section<SourcedSeries>) -> Result<()> {
    match section {
        Section::Ready(sourced) => match sourced.series.latest() {
            Some((date, value)) => {
                println!(
                    "10Y Treasury yield: {value:.2}% on {} (source: {}, {} points)",
                    date.date(),
                    sourced.source,
                    sourced.series.len()
                );
                for (ts, v) in sourced.series.tail(TABLE_ROWS).iter() {
                    println!("  {}  {v:>6.2}", ts.date());
                }
            }
            None => println!("10Y Treasury yield: no observations"),
        },
        Section::Unavailable { reason } => println!("10Y Treasury yield unavailable: {reason}"),
    }
    Ok(())
}

fn print_haven(section: &Section<HavenAssets>) -> Result<()> {
    match section {
        Section::Ready(haven) => {
            let changes: Vec<String> = haven
                .changes
                .iter()
                .map(|c| format!("{} {:+.2}%", c.name, c.change_pct))
                .collect();
            println!("Safe havens (window change): {}", changes.join(", "));
            let frame = haven.series.to_frame()?;
            println!("{}", frame.tail(Some(TABLE_ROWS)));
        }
        Section::Unavailable { reason } => println!("Safe havens unavailable: {reason}"),
    }
    Ok(())
}

fn print_sectors(changes: &[SectorChange]) -> Result<()> {
    println!("Sector 1D % change");
    if changes.is_empty() {
        println!("  no sector data available right now");
    }
    for change in changes {
        println!("  {:<18} {:<5} {:>+7.2}%", change.name, change.ticker, change.change_pct);
    }
    Ok(())
}

fn print_signals(report: &SignalReport) -> Result<()> {
    println!("Signals");
    for signal in &report.signals {
        println!("  {:<18} {:>8}  {}", signal.indicator, signal.value, signal.label);
    }
    println!("Guidance: {}", report.guidance);
    Ok(())
}
