use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use std::time::Duration;

/// HTTP client construction utilities
///
/// Create an HTTP client with a request timeout and default headers
pub fn create_http_client_with_context(
    timeout: Duration,
    user_agent: &str,
    default_headers: HeaderMap,
) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .default_headers(default_headers)
        .build()
        .context("Failed to create HTTP client")
}
