// src/fetch/urls.rs

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;
use url::{form_urlencoded, Url};

use crate::error::{NmdbError, Result};

/// Query template of the NEST "draw graph" form for the OULU monitor.
///
/// The date fields and `output` are always overwritten by [`UrlBuilder::build`];
/// `output=plot` in particular is useless for machine parsing.
pub const DEFAULT_URL: &str = "https://www.nmdb.eu/nest/draw_graph.php?\
formchk=1&stations[]=OULU&tabchoice=revori&dtype=corr_for_efficiency&\
tresolution=5&yunits=0&shift=2&date_choice=bydate&\
start_day=29&start_month=7&start_year=2025&start_hour=0&start_min=0&\
end_day=29&end_month=8&end_year=2025&end_hour=23&end_min=59&\
output=plot&ygrid=1&mline=1&transp=0&fontsize=1&text_color=222222&\
background_color=FFFFFF&margin_color=FFFFFF";

/// `output` value that makes the service answer with plain text rows.
pub const ASCII_OUTPUT: &str = "ascii";

const STATION_KEY: &str = "stations[]";

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("date regex should compile"));
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}$").expect("time regex should compile"));

/// One validated edge of a [`QueryWindow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    date: String,
    time: String,
}

/// Form values for one boundary, zero padding already stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryParts {
    pub day: String,
    pub month: String,
    pub year: String,
    pub hour: String,
    pub minute: String,
}

impl Boundary {
    pub fn new(date: &str, time: &str) -> Result<Self> {
        if !DATE_RE.is_match(date) {
            return Err(NmdbError::InvalidDate(date.to_owned()));
        }
        if !TIME_RE.is_match(time) {
            return Err(NmdbError::InvalidTime(time.to_owned()));
        }
        Ok(Self {
            date: date.to_owned(),
            time: time.to_owned(),
        })
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn time(&self) -> &str {
        &self.time
    }

    pub fn parts(&self) -> BoundaryParts {
        // both strings were checked against fixed-width patterns in `new`
        let (year, rest) = self.date.split_at(4);
        let month = &rest[1..3];
        let day = &rest[4..6];
        let (hour, minute) = self.time.split_at(2);
        BoundaryParts {
            day: strip_zeros(day),
            month: strip_zeros(month),
            year: year.to_owned(),
            hour: strip_zeros(hour),
            minute: strip_zeros(&minute[1..]),
        }
    }
}

/// The form wants `7`, not `07`; a bare zero stays `0`.
fn strip_zeros(field: &str) -> String {
    match field.trim_start_matches('0') {
        "" => "0".to_owned(),
        s => s.to_owned(),
    }
}

/// Caller supplied start/end of the requested data.
///
/// Both ends are validated independently; an inverted window is passed through as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryWindow {
    pub start: Boundary,
    pub end: Boundary,
}

impl QueryWindow {
    pub fn new(start_date: &str, start_time: &str, end_date: &str, end_time: &str) -> Result<Self> {
        Ok(Self {
            start: Boundary::new(start_date, start_time)?,
            end: Boundary::new(end_date, end_time)?,
        })
    }

    /// The ten date fields of the form, in form order.
    pub fn query_fields(&self) -> Vec<(&'static str, String)> {
        let s = self.start.parts();
        let e = self.end.parts();
        vec![
            ("start_day", s.day),
            ("start_month", s.month),
            ("start_year", s.year),
            ("start_hour", s.hour),
            ("start_min", s.minute),
            ("end_day", e.day),
            ("end_month", e.month),
            ("end_year", e.year),
            ("end_hour", e.hour),
            ("end_min", e.minute),
        ]
    }
}

/// Rewrites a NEST query template for a specific window.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    base: Url,
    station: Option<String>,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self {
            base: Url::parse(DEFAULT_URL).expect("default NMDB template should parse"),
            station: None,
        }
    }
}

impl UrlBuilder {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|source| NmdbError::InvalidBaseUrl {
            url: base_url.to_owned(),
            source,
        })?;
        Ok(Self {
            base,
            station: None,
        })
    }

    /// `base_url` when given, the built-in OULU template otherwise.
    pub fn from_base_url(base_url: Option<&str>) -> Result<Self> {
        match base_url {
            Some(base) => Self::new(base),
            None => Ok(Self::default()),
        }
    }

    /// Replace the `stations[]` selector of the template.
    pub fn with_station(mut self, station: impl Into<String>) -> Self {
        self.station = Some(station.into());
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Template with the window's date fields and `output=ascii` written in.
    pub fn build(&self, window: &QueryWindow) -> Url {
        let mut overrides = window.query_fields();
        overrides.push(("output", ASCII_OUTPUT.to_owned()));
        if let Some(station) = &self.station {
            overrides.push((STATION_KEY, station.clone()));
        }

        let query = rewrite_query(self.base.query(), &overrides);
        let mut url = self.base.clone();
        url.set_query(Some(&query));
        trace!(%url, "built ascii url");
        url
    }
}

/// Overwrite `overrides` in a raw query string.
///
/// Untouched segments are copied byte for byte. An overridden key keeps the
/// position of its first occurrence, later duplicates are dropped and keys the
/// template lacks are appended in `overrides` order.
fn rewrite_query(query: Option<&str>, overrides: &[(&str, String)]) -> String {
    let mut written = vec![false; overrides.len()];
    let mut segments = Vec::new();

    for segment in query.unwrap_or("").split('&').filter(|s| !s.is_empty()) {
        let raw_key = segment.split('=').next().unwrap_or(segment);
        let key = decode_key(raw_key);
        match overrides.iter().position(|(k, _)| *k == key) {
            Some(i) if written[i] => {}
            Some(i) => {
                written[i] = true;
                segments.push(format!("{}={}", raw_key, encode_value(&overrides[i].1)));
            }
            None => segments.push(segment.to_owned()),
        }
    }

    for ((key, value), done) in overrides.iter().zip(&written) {
        if !done {
            segments.push(format!("{}={}", key, encode_value(value)));
        }
    }

    segments.join("&")
}

fn decode_key(raw: &str) -> String {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

fn encode_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_zero_padding_is_stripped() {
        let b = Boundary::new("2025-07-05", "00:05").unwrap();
        let p = b.parts();
        assert_eq!(p.day, "5");
        assert_eq!(p.month, "7");
        assert_eq!(p.year, "2025");
        assert_eq!(p.hour, "0");
        assert_eq!(p.minute, "5");

        let b = Boundary::new("2025-10-30", "23:00").unwrap();
        let p = b.parts();
        assert_eq!(p.day, "30");
        assert_eq!(p.month, "10");
        assert_eq!(p.minute, "0");
    }

    #[test]
    fn test_rejects_malformed_boundaries() {
        for date in ["2025-7-29", "29-07-2025", "2025/07/29", "2025-07-29 ", ""] {
            let err = Boundary::new(date, "00:00").unwrap_err();
            assert!(matches!(err, NmdbError::InvalidDate(_)), "{date:?}");
            assert!(err.is_validation());
        }
        for time in ["0:00", "00:00:00", "0000", "ab:cd"] {
            let err = Boundary::new("2025-07-29", time).unwrap_err();
            assert!(matches!(err, NmdbError::InvalidTime(_)), "{time:?}");
        }
        // pattern only; the calendar is the service's problem
        assert!(Boundary::new("2025-13-45", "99:99").is_ok());
    }

    #[test]
    fn test_window_checks_both_ends() {
        assert!(QueryWindow::new("2025-07-29", "00:00", "2025-08-29", "23:59").is_ok());
        assert!(matches!(
            QueryWindow::new("2025-07-29", "00:00", "20250829", "23:59"),
            Err(NmdbError::InvalidDate(d)) if d == "20250829"
        ));
        // end before start is not our call
        assert!(QueryWindow::new("2025-08-29", "00:00", "2025-07-29", "00:00").is_ok());
    }

    #[test]
    fn test_build_overwrites_fields_and_keeps_the_rest() {
        let window = QueryWindow::new("2024-07-09", "00:00", "2025-08-29", "23:59").unwrap();
        let url = UrlBuilder::default().build(&window);
        let q: HashMap<_, _> = pairs(&url).into_iter().collect();

        let expected = [
            ("start_day", "9"),
            ("start_month", "7"),
            ("start_year", "2024"),
            ("start_hour", "0"),
            ("start_min", "0"),
            ("end_day", "29"),
            ("end_month", "8"),
            ("end_year", "2025"),
            ("end_hour", "23"),
            ("end_min", "59"),
            ("output", "ascii"),
        ];
        for (k, v) in expected {
            assert_eq!(q.get(k).map(String::as_str), Some(v), "{k}");
        }

        let raw = url.query().unwrap();
        for untouched in [
            "formchk=1",
            "stations[]=OULU",
            "tabchoice=revori",
            "dtype=corr_for_efficiency",
            "tresolution=5",
            "text_color=222222",
            "margin_color=FFFFFF",
        ] {
            assert!(raw.split('&').any(|s| s == untouched), "{untouched}");
        }
        assert_eq!(url.host_str(), Some("www.nmdb.eu"));
        assert_eq!(url.path(), "/nest/draw_graph.php");
        // nothing added, nothing lost
        assert_eq!(pairs(&url).len(), pairs(UrlBuilder::default().base()).len());
    }

    #[test]
    fn test_build_appends_missing_fields() {
        let builder = UrlBuilder::new("https://example.org/q.php?b=2&a=%20x").unwrap();
        let window = QueryWindow::new("2025-01-02", "03:04", "2025-01-03", "05:06").unwrap();
        let url = builder.build(&window);
        assert_eq!(
            url.query().unwrap(),
            "b=2&a=%20x&start_day=2&start_month=1&start_year=2025&start_hour=3&start_min=4\
             &end_day=3&end_month=1&end_year=2025&end_hour=5&end_min=6&output=ascii"
        );
    }

    #[test]
    fn test_build_is_order_insensitive_and_collapses_duplicates() {
        let builder = UrlBuilder::new(
            "https://example.org/q?output=plot&end_min=1&x=y&start_day=3&output=image",
        )
        .unwrap();
        let window = QueryWindow::new("2025-07-29", "12:30", "2025-07-30", "00:00").unwrap();
        let url = builder.build(&window);
        let raw = url.query().unwrap();
        assert!(raw.starts_with("output=ascii&end_min=0&x=y&start_day=29&"));
        assert_eq!(raw.matches("output=").count(), 1);
        assert_eq!(pairs(&url).len(), 12);
    }

    #[test]
    fn test_station_override_matches_encoded_key() {
        let builder = UrlBuilder::new("https://example.org/q?stations%5B%5D=OULU&z=1")
            .unwrap()
            .with_station("JUNG");
        let window = QueryWindow::new("2025-07-29", "00:00", "2025-07-29", "01:00").unwrap();
        let url = builder.build(&window);
        let stations: Vec<_> = pairs(&url)
            .into_iter()
            .filter(|(k, _)| k == "stations[]")
            .collect();
        assert_eq!(stations, vec![("stations[]".to_owned(), "JUNG".to_owned())]);
        assert!(url.query().unwrap().starts_with("stations%5B%5D=JUNG&z=1&"));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = UrlBuilder::new("not a url").unwrap_err();
        assert!(matches!(err, NmdbError::InvalidBaseUrl { .. }));
        assert!(err.is_validation());
        assert!(UrlBuilder::from_base_url(Some("not a url")).is_err());
    }

    #[test]
    fn test_from_base_url_picks_template() {
        let default = UrlBuilder::from_base_url(None).unwrap();
        assert_eq!(default.base().as_str(), UrlBuilder::default().base().as_str());
        assert_eq!(default.base().host_str(), Some("www.nmdb.eu"));

        let custom = UrlBuilder::from_base_url(Some("https://example.org/q?a=1")).unwrap();
        assert_eq!(custom.base().as_str(), "https://example.org/q?a=1");
    }
}
