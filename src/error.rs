// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong while turning an NMDB query into a CSV.
#[derive(Error, Debug)]
pub enum NmdbError {
    /// A date boundary did not look like `YYYY-MM-DD`.
    #[error("invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A time boundary did not look like `HH:MM`.
    #[error("invalid time {0:?}: expected HH:MM")]
    InvalidTime(String),

    /// The base query template could not be parsed as a URL.
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The HTTP client itself could not be constructed.
    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection failure, timeout or unreadable body.
    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("GET {url} returned {status}")]
    Http {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    /// Not a single line of the response produced a valid row.
    #[error("no valid rows extracted; raw response saved to {}", debug_path.display())]
    EmptyResult { debug_path: PathBuf },

    #[error("I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// A CSV being read back held a datetime outside `%Y-%m-%d %H:%M:%S`.
    #[error("CSV record {record}: unparseable datetime {value:?}")]
    InvalidCsvTimestamp { record: u64, value: String },
}

impl NmdbError {
    /// True for errors raised from caller input, before any network traffic.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            NmdbError::InvalidDate(_) | NmdbError::InvalidTime(_) | NmdbError::InvalidBaseUrl { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NmdbError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = NmdbError> = std::result::Result<T, E>;
