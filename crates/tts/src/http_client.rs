use std::time::Duration;

use axum::http;
use reqwest::Client;

/// HTTP client for talking to the speech provider
///
/// Built once per provider at startup. `read_timeout` bounds the gap
/// between reads; there is no deadline for the whole response.
pub fn http_client(connect_timeout: Duration, read_timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = http::HeaderMap::new();
    headers.insert(http::header::CONNECTION, http::HeaderValue::from_static("keep-alive"));

    Client::builder()
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
        .build()
}
