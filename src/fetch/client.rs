// src/fetch/client.rs

use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{NmdbError, Result};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = concat!("nmdbscraper/", env!("CARGO_PKG_VERSION"));

/// Single-shot blocking downloader for NEST text responses.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(NmdbError::Client)?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// GET `url` and buffer the whole body. No retries.
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    pub fn get_text(&self, url: &Url) -> Result<String> {
        let request_err = |source: reqwest::Error| NmdbError::Request {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url.clone()).send().map_err(request_err)?;
        let status = resp.status();
        let resp = resp.error_for_status().map_err(|source| NmdbError::Http {
            url: url.to_string(),
            status,
            source,
        })?;
        let body = resp.text().map_err(request_err)?;
        debug!(%status, bytes = body.len(), "response received");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_get_text_returns_body_and_sends_user_agent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/nest/draw_graph.php")
            .match_query(Matcher::UrlEncoded("output".into(), "ascii".into()))
            .match_header("user-agent", USER_AGENT)
            .with_status(200)
            .with_body("2025-07-29 00:05:00 12345.6\n")
            .create();

        let url = Url::parse(&format!("{}/nest/draw_graph.php?output=ascii", server.url())).unwrap();
        let body = Fetcher::new().unwrap().get_text(&url).unwrap();

        assert_eq!(body, "2025-07-29 00:05:00 12345.6\n");
        mock.assert();
    }

    #[test]
    fn test_non_success_status_is_http_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/nest/draw_graph.php")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("maintenance")
            .create();

        let url = Url::parse(&format!("{}/nest/draw_graph.php?x=1", server.url())).unwrap();
        let err = Fetcher::new().unwrap().get_text(&url).unwrap_err();

        match err {
            NmdbError::Http { status, .. } => assert_eq!(status.as_u16(), 503),
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_host_is_request_error() {
        // grab a free port, then close it so nothing is listening
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/nest")).unwrap();
        let fetcher = Fetcher::with_timeout(Duration::from_secs(2)).unwrap();

        let err = fetcher.get_text(&url).unwrap_err();
        assert!(matches!(err, NmdbError::Request { .. }), "{err:?}");
        assert!(!err.is_validation());
    }
}
