use anyhow::{Context, Result};
use clap::Parser;
use nmdbscraper::{
    fetch::Fetcher, Exporter, QueryWindow, UrlBuilder, DEBUG_DUMP_PATH, DEFAULT_OUT_PATH,
};
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Download NMDB neutron-monitor counts for a time window and save them as CSV
#[derive(Parser, Debug)]
#[command(name = "nmdbscraper", version)]
struct Cli {
    /// First day of the window (YYYY-MM-DD)
    start_date: String,
    /// Start time on that day (HH:MM, 24h)
    start_time: String,
    /// Last day of the window (YYYY-MM-DD)
    end_date: String,
    /// End time on that day (HH:MM, 24h)
    end_time: String,

    /// Output CSV path
    #[arg(long, short, default_value = DEFAULT_OUT_PATH)]
    out: PathBuf,

    /// NEST query template to rewrite instead of the built-in OULU one
    #[arg(long, env = "NMDB_BASE_URL")]
    base_url: Option<String>,

    /// Station code overriding the template's `stations[]`
    #[arg(long, env = "NMDB_STATION")]
    station: Option<String>,

    /// Where the raw response is dumped when nothing can be parsed
    #[arg(long, default_value = DEBUG_DUMP_PATH)]
    debug_path: PathBuf,

    /// HTTP timeout in seconds
    #[arg(long, env = "NMDB_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Rows printed after saving
    #[arg(long, default_value_t = 5)]
    preview: usize,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();

    // ─── 2) validate the window before touching the network ─────────
    let window = QueryWindow::new(&cli.start_date, &cli.start_time, &cli.end_date, &cli.end_time)
        .context("invalid query window")?;

    let mut urls = UrlBuilder::from_base_url(cli.base_url.as_deref())?;
    if let Some(station) = &cli.station {
        urls = urls.with_station(station.as_str());
    }
    let fetcher = Fetcher::with_timeout(Duration::from_secs(cli.timeout_secs))?;

    // ─── 3) fetch, parse, save ───────────────────────────────────────
    let (path, table) = Exporter::new(urls, fetcher)
        .with_debug_path(&cli.debug_path)
        .export(&window, &cli.out)
        .with_context(|| format!("exporting to {}", cli.out.display()))?;

    info!(rows = table.len(), "done");
    println!("CSV saved to {} ({} rows)", path.display(), table.len());
    for row in table.head(cli.preview) {
        println!(
            "{}  {}",
            row.timestamp.format(nmdbscraper::process::table::CSV_DATETIME_FORMAT),
            row.count
        );
    }
    Ok(())
}
