// src/process/table.rs

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::{Read, Write},
    path::Path,
};
use tracing::{debug, instrument};

use super::date_parser::{parse_count, parse_timestamp};
use super::lines::RawRow;
use crate::error::{NmdbError, Result};

/// Datetime layout of the `datetime` CSV column.
pub const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One validated sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    pub timestamp: NaiveDateTime,
    pub count: f64,
}

impl Row {
    /// `None` when either text does not parse.
    pub fn from_raw(raw: &RawRow) -> Option<Self> {
        Some(Self {
            timestamp: parse_timestamp(&raw.datetime)?,
            count: parse_count(&raw.count)?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRecord {
    datetime: String,
    count: f64,
}

/// Rows sorted by timestamp. Equal timestamps keep their input order and
/// are never merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<Row>,
}

impl ResultTable {
    /// Convert, drop rows that fail to parse, stable-sort by time.
    #[instrument(level = "debug", skip(raw))]
    pub fn from_raw_rows<'a>(raw: impl IntoIterator<Item = &'a RawRow>) -> Self {
        let mut seen = 0usize;
        let mut rows: Vec<Row> = raw
            .into_iter()
            .inspect(|_| seen += 1)
            .filter_map(Row::from_raw)
            .collect();
        rows.sort_by_key(|r| r.timestamp);
        debug!(raw = seen, kept = rows.len(), "assembled table");
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn head(&self, n: usize) -> &[Row] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Write `datetime,count` CSV, no index column.
    pub fn write_csv<W: Write>(&self, dest: W) -> Result<()> {
        let mut w = csv::Writer::from_writer(dest);
        for row in &self.rows {
            w.serialize(CsvRecord {
                datetime: row.timestamp.format(CSV_DATETIME_FORMAT).to_string(),
                count: row.count,
            })?;
        }
        if self.rows.is_empty() {
            w.write_record(["datetime", "count"])?;
        }
        w.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Write to `path` through a sibling temp file so a failed write never
    /// leaves a truncated CSV behind.
    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table.csv".to_owned());
        let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

        let written = fs::File::create(&tmp_path)
            .map_err(|e| NmdbError::io(&tmp_path, e))
            .and_then(|file| self.write_csv(file));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            NmdbError::io(path, e)
        })
    }

    /// Read back a CSV produced by [`ResultTable::write_csv`].
    ///
    /// Rows are taken in file order, not re-sorted.
    pub fn read_csv<R: Read>(src: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(src);
        let mut rows = Vec::new();
        for (i, rec) in rdr.deserialize::<CsvRecord>().enumerate() {
            let rec = rec?;
            let timestamp = NaiveDateTime::parse_from_str(&rec.datetime, CSV_DATETIME_FORMAT)
                .map_err(|_| NmdbError::InvalidCsvTimestamp {
                    record: i as u64 + 1,
                    value: rec.datetime.clone(),
                })?;
            rows.push(Row {
                timestamp,
                count: rec.count,
            });
        }
        Ok(Self { rows })
    }

    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| NmdbError::io(path, e))?;
        Self::read_csv(file)
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
