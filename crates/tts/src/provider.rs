pub mod elevenlabs;
pub mod elevenlabs_http;

use async_trait::async_trait;

use crate::{
    error::TtsError,
    types::{AudioStream, SpeechRequest},
};

/// A speech provider reachable over some transport
///
/// Implementations make exactly one outbound call per invocation and never
/// retry.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Start synthesis and return the provider's audio as it arrives
    async fn synthesize(&self, request: &SpeechRequest) -> crate::Result<AudioStream>;

    /// Get the provider name
    fn name(&self) -> &str;
}

/// Turn a non-2xx provider response into an error
async fn check_status(provider: &str, response: reqwest::Response) -> crate::Result<reqwest::Response> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

    tracing::error!("{provider} API error ({status}): {error_text}");

    Err(match status.as_u16() {
        401 => TtsError::AuthenticationFailed(error_text),
        code => TtsError::ProviderApiError {
            status: code,
            message: error_text,
        },
    })
}
