// src/export.rs

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};

use crate::error::{NmdbError, Result};
use crate::fetch::{Fetcher, QueryWindow, UrlBuilder};
use crate::process::{parse_lines, ResultTable};

pub const DEFAULT_OUT_PATH: &str = "nmdb_oulu.csv";
/// Where the raw response lands when nothing in it could be parsed.
pub const DEBUG_DUMP_PATH: &str = "nmdb_debug.txt";

/// Download `[start, end]` from NMDB and save it as CSV at `out_path`.
///
/// `base_url` replaces [`crate::fetch::DEFAULT_URL`] as the query template.
/// Returns the CSV path together with the table that was written.
pub fn produce_table(
    start_date: &str,
    start_time: &str,
    end_date: &str,
    end_time: &str,
    out_path: impl AsRef<Path>,
    base_url: Option<&str>,
) -> Result<(PathBuf, ResultTable)> {
    let window = QueryWindow::new(start_date, start_time, end_date, end_time)?;
    let urls = UrlBuilder::from_base_url(base_url)?;
    Exporter::new(urls, Fetcher::new()?).export(&window, out_path)
}

/// Parse a raw NEST response and write it to `out_path`.
///
/// If no row survives, `text` is dumped verbatim to `debug_path` and
/// [`NmdbError::EmptyResult`] is returned; the CSV is left untouched.
#[instrument(level = "debug", skip(text), fields(content_len = text.len()))]
pub fn save_table(
    text: &str,
    out_path: impl AsRef<Path> + std::fmt::Debug,
    debug_path: impl AsRef<Path> + std::fmt::Debug,
) -> Result<ResultTable> {
    let table = ResultTable::from_raw_rows(&parse_lines(text));

    if table.is_empty() {
        let debug_path = debug_path.as_ref();
        fs::write(debug_path, text).map_err(|e| NmdbError::io(debug_path, e))?;
        warn!(debug_path = %debug_path.display(), "no valid rows; raw response dumped");
        return Err(NmdbError::EmptyResult {
            debug_path: debug_path.to_path_buf(),
        });
    }

    table.save_csv(out_path.as_ref())?;
    Ok(table)
}

/// Builder → fetch → parse → CSV, one window at a time.
#[derive(Debug, Clone)]
pub struct Exporter {
    urls: UrlBuilder,
    fetcher: Fetcher,
    debug_path: PathBuf,
}

impl Exporter {
    pub fn new(urls: UrlBuilder, fetcher: Fetcher) -> Self {
        Self {
            urls,
            fetcher,
            debug_path: PathBuf::from(DEBUG_DUMP_PATH),
        }
    }

    pub fn with_debug_path(mut self, debug_path: impl Into<PathBuf>) -> Self {
        self.debug_path = debug_path.into();
        self
    }

    pub fn debug_path(&self) -> &Path {
        &self.debug_path
    }

    pub fn export(
        &self,
        window: &QueryWindow,
        out_path: impl AsRef<Path>,
    ) -> Result<(PathBuf, ResultTable)> {
        let out_path = out_path.as_ref();
        let url = self.urls.build(window);

        info!(%url, "downloading");
        let text = self.fetcher.get_text(&url)?;

        let table = save_table(&text, out_path, &self.debug_path)?;
        info!(path = %out_path.display(), rows = table.len(), "CSV saved");
        Ok((out_path.to_path_buf(), table))
    }
}
