#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod error;
pub mod frame;
mod http_client;
pub mod provider;
mod request;
mod service;
pub mod transcode;
mod types;

use std::sync::Arc;

use axum::{Router, extract::State, response::Response, routing::post};

pub use error::{Result, TEXT_REQUIRED, TtsError};
pub use provider::TtsProvider;
pub use request::ExtractText;
pub use service::{TtsService, TtsServiceBuilder};
pub use types::{AudioStream, SpeechRequest};

/// Path of the synthesis endpoint
pub const SPEECH_ROUTE: &str = "/text-to-speech-stream";

/// Build the TTS service from configuration
pub fn build_service(config: &relay_config::Config) -> anyhow::Result<Arc<TtsService>> {
    let service = Arc::new(
        TtsServiceBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize TTS service: {e}"))?,
    );
    Ok(service)
}

/// Create the endpoint router for TTS
pub fn endpoint_router() -> Router<Arc<TtsService>> {
    Router::new().route(SPEECH_ROUTE, post(text_to_speech_stream))
}

/// Handle streamed speech synthesis requests
async fn text_to_speech_stream(
    State(service): State<Arc<TtsService>>,
    payload: std::result::Result<ExtractText, TtsError>,
) -> Result<Response> {
    let ExtractText(text) = payload.inspect_err(|e| {
        tracing::warn!("Rejected TTS request: {e}");
        service.record_rejected();
    })?;

    service.respond(text).await
}
