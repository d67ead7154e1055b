use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::{KeyValue, global, metrics::Histogram};
use relay_telemetry::metrics::{HTTP_REQUEST_DURATION, record_duration};

/// Records `http.server.request.duration` for every request
///
/// The duration covers the handler up to the response head. Streamed
/// audio bodies are measured separately by the TTS service.
pub async fn http_metrics_middleware(histogram: Histogram<f64>, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |path| path.as_str().to_string());

    let response = next.run(request).await;

    record_duration(
        &histogram,
        started,
        &[
            KeyValue::new("http.request.method", method),
            KeyValue::new("http.route", route),
            KeyValue::new("http.response.status_code", i64::from(response.status().as_u16())),
        ],
    );

    response
}

pub fn request_duration_histogram() -> Histogram<f64> {
    global::meter("tts-relay")
        .f64_histogram(HTTP_REQUEST_DURATION)
        .with_unit("s")
        .with_description("Duration of inbound HTTP requests")
        .build()
}
