// src/bin/reparse.rs
//
// Re-run the ascii parser over a response saved to disk (usually the debug
// dump) and write the CSV without talking to NMDB again.

use anyhow::{Context, Result};
use clap::Parser;
use nmdbscraper::{save_table, DEBUG_DUMP_PATH, DEFAULT_OUT_PATH};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Convert a saved NEST ascii response into CSV
#[derive(Parser, Debug)]
#[command(name = "reparse", version)]
struct Args {
    /// Saved response text
    #[arg(default_value = DEBUG_DUMP_PATH)]
    input: PathBuf,

    /// Output CSV path
    #[arg(long, short, default_value = DEFAULT_OUT_PATH)]
    out: PathBuf,

    /// Dump target if the input holds no valid rows
    #[arg(long, default_value = DEBUG_DUMP_PATH)]
    debug_path: PathBuf,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;

    let table = save_table(&text, &args.out, &args.debug_path)
        .with_context(|| format!("converting {}", args.input.display()))?;

    info!(path = %args.out.display(), rows = table.len(), "CSV saved");
    println!("CSV saved to {} ({} rows)", args.out.display(), table.len());
    Ok(())
}
