use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtsError>;

/// Message returned when the request carries no usable text
pub const TEXT_REQUIRED: &str = "Text is required";

/// Context attached to every failure reported after validation
const PROCESSING_FAILED: &str = "Error processing text-to-speech request";

/// Speech relay errors
///
/// Input errors map to 400. Everything that goes wrong after validation
/// collapses to a 500 carrying the underlying message.
#[derive(Debug, Error)]
pub enum TtsError {
    /// `text` missing, empty, or not a string
    #[error("Text is required")]
    MissingText,

    /// The request body could not be read or parsed
    #[error("Invalid request body: {0}")]
    InvalidRequest(String),

    /// Provider rejected the credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Provider API returned an error status
    #[error("Provider API error ({status}): {message}")]
    ProviderApiError { status: u16, message: String },

    /// Network or connection error before any audio arrived
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The provider's audio stream broke off
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// The transcoding stage failed
    #[error("Transcoding failed: {0}")]
    Transcode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalError,
}

impl TtsError {
    /// Get the appropriate HTTP status code for this error
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingText | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable kind used in logs and metrics
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingText | Self::InvalidRequest(_) => "input",
            Self::AuthenticationFailed(_)
            | Self::ProviderApiError { .. }
            | Self::ConnectionError(_)
            | Self::Stream(_) => "upstream",
            Self::Transcode(_) => "transcode",
            Self::ConfigError(_) | Self::InternalError => "internal",
        }
    }
}

/// JSON error body: `{ message, error }`
#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl IntoResponse for TtsError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Self::MissingText => ErrorResponse {
                message: TEXT_REQUIRED.to_string(),
                error: None,
            },
            Self::InvalidRequest(reason) => ErrorResponse {
                message: "Invalid request body".to_string(),
                error: Some(reason),
            },
            other => {
                tracing::error!(kind = other.kind(), error = %other, "TTS processing error");

                ErrorResponse {
                    message: PROCESSING_FAILED.to_string(),
                    error: Some(other.to_string()),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(error: TtsError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_text_has_message_only() {
        let (status, body) = body_json(TtsError::MissingText).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, serde_json::json!({ "message": "Text is required" }));
    }

    #[tokio::test]
    async fn upstream_failures_collapse_to_500() {
        let (status, body) = body_json(TtsError::ProviderApiError {
            status: 503,
            message: "overloaded".to_string(),
        })
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error processing text-to-speech request");
        assert_eq!(body["error"], "Provider API error (503): overloaded");
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(TtsError::MissingText.kind(), "input");
        assert_eq!(TtsError::ConnectionError("refused".into()).kind(), "upstream");
        assert_eq!(TtsError::Transcode("exit 1".into()).kind(), "transcode");
    }
}
