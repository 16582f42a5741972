use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

pub const APP_USER_AGENT: &str = "Conduit/0.1.0";

/// Fixed per-request timeout for artifact fetches.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Build the shared HTTP client.
///
/// The timeout bounds connection setup and each read, not the whole transfer,
/// so large archives stream fine as long as bytes keep arriving.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .build()
}
