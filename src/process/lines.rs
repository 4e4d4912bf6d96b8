// src/process/lines.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, instrument, trace};

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date regex should compile"));
static CLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}:[0-9]{2}(:[0-9]{2})?$").expect("clock regex should compile")
});
static NUM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?$").expect("number regex should compile")
});
static NUM_SEARCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[+-]?[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?").expect("number regex should compile")
});
static EMBEDDED_DT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{4}-[0-9]{2}-[0-9]{2})[T ]([0-9]{2}:[0-9]{2}(?::[0-9]{2})?)")
        .expect("datetime regex should compile")
});

/// Row shapes seen in NEST ascii output, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineFormat {
    /// `YYYY-MM-DD HH:MM[:SS] count ...`
    DateTimeCount,
    /// `YYYY-MM-DD count ...`
    DateCount,
    /// `<anything> count`
    TrailingCount,
    /// a datetime and a number somewhere in the line
    Embedded,
}

impl LineFormat {
    pub const PRIORITY: [LineFormat; 4] = [
        LineFormat::DateTimeCount,
        LineFormat::DateCount,
        LineFormat::TrailingCount,
        LineFormat::Embedded,
    ];

    /// `(datetime, count)` texts if `tokens` has this shape.
    pub fn extract(self, tokens: &[&str]) -> Option<(String, String)> {
        match self {
            LineFormat::DateTimeCount => {
                if tokens.len() >= 3 && DATE_RE.is_match(tokens[0]) && CLOCK_RE.is_match(tokens[1])
                {
                    Some((format!("{} {}", tokens[0], tokens[1]), tokens[2].to_owned()))
                } else {
                    None
                }
            }
            LineFormat::DateCount => {
                if tokens.len() >= 2 && DATE_RE.is_match(tokens[0]) && NUM_RE.is_match(tokens[1]) {
                    Some((tokens[0].to_owned(), tokens[1].to_owned()))
                } else {
                    None
                }
            }
            LineFormat::TrailingCount => match tokens.split_last() {
                Some((last, head)) if !head.is_empty() && NUM_RE.is_match(last) => {
                    Some((head.join(" "), (*last).to_owned()))
                }
                _ => None,
            },
            LineFormat::Embedded => {
                let joined = tokens.join(" ");
                let caps = EMBEDDED_DT_RE.captures(&joined)?;
                // both searches run over the whole line, independently
                let count = NUM_SEARCH_RE.find(&joined)?.as_str().to_owned();
                Some((format!("{} {}", &caps[1], &caps[2]), count))
            }
        }
    }
}

/// Unvalidated `(datetime, count)` texts pulled from one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub datetime: String,
    pub count: String,
    pub format: LineFormat,
}

/// Recognize one line; `None` for blanks, `#` comments and unknown shapes.
pub fn parse_line(line: &str) -> Option<RawRow> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();

    LineFormat::PRIORITY.iter().find_map(|&format| {
        format
            .extract(&tokens)
            .map(|(datetime, count)| RawRow {
                datetime,
                count,
                format,
            })
    })
}

/// Line boundaries: `\n`, `\r`, vertical tab, form feed, the file/group/record
/// separators, NEL and the Unicode line/paragraph separators.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Every recognizable row of a NEST ascii response, in input order.
#[instrument(level = "debug", skip(text), fields(content_len = text.len()))]
pub fn parse_lines(text: &str) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for line in text.split(is_line_break) {
        match parse_line(line) {
            Some(row) => {
                trace!(datetime = %row.datetime, count = %row.count, format = ?row.format, "row");
                rows.push(row);
            }
            None => {
                let line = line.trim();
                if !line.is_empty() && !line.starts_with('#') {
                    trace!(line, "unrecognized line skipped");
                    skipped += 1;
                }
            }
        }
    }

    debug!(rows = rows.len(), skipped, "finished ascii parsing");
    rows
}
