pub mod error;
pub mod export;
pub mod fetch;
pub mod process;

pub use error::{NmdbError, Result};
pub use export::{produce_table, save_table, Exporter, DEBUG_DUMP_PATH, DEFAULT_OUT_PATH};
pub use fetch::{Fetcher, QueryWindow, UrlBuilder};
pub use process::{ResultTable, Row};
