// src/process/mod.rs

pub mod date_parser;
pub mod lines;
pub mod table;

pub use lines::{parse_line, parse_lines, LineFormat, RawRow};
pub use table::{ResultTable, Row};
