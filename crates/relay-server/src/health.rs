use axum::response::IntoResponse;
use http::StatusCode;

/// Liveness probe; never touches the provider
pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
