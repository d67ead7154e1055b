use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::{
    error::TtsError,
    types::{AudioStream, SpeechRequest},
};

use super::{TtsProvider, check_status};

pub(crate) const DEFAULT_ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io/v1";

/// Connection details shared by both `ElevenLabs` transports
pub(crate) struct ElevenLabsApi {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl ElevenLabsApi {
    pub(crate) fn new(client: Client, api_key: SecretString, base_url: Option<&Url>) -> Self {
        let base_url = base_url
            .map_or(DEFAULT_ELEVENLABS_API_URL, Url::as_str)
            .trim_end_matches('/')
            .to_string();

        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// `POST {base}/text-to-speech/{voice_id}{suffix}?output_format=...` with auth
    pub(crate) fn text_to_speech(&self, request: &SpeechRequest, suffix: &str) -> RequestBuilder {
        let url = format!("{}/text-to-speech/{}{suffix}", self.base_url, request.voice_id);

        self.client
            .post(url)
            .query(&[("output_format", request.output_format.as_str())])
            .header("xi-api-key", self.api_key.expose_secret())
    }

    /// Send a prepared request, mapping transport and status failures
    pub(crate) async fn send(&self, provider: &str, builder: RequestBuilder) -> crate::Result<reqwest::Response> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!("{provider} request failed: {e}");
            TtsError::ConnectionError(format!("Failed to send request to ElevenLabs: {e}"))
        })?;

        check_status(provider, response).await
    }
}

/// `ElevenLabs` streaming transport
///
/// Uses the `/stream` endpoint and hands chunks on as the provider produces
/// them.
pub struct ElevenLabsProvider {
    api: ElevenLabsApi,
    name: String,
}

impl ElevenLabsProvider {
    pub fn new(name: String, client: Client, api_key: SecretString, base_url: Option<&Url>) -> Self {
        Self {
            api: ElevenLabsApi::new(client, api_key, base_url),
            name,
        }
    }
}

#[derive(serde::Serialize)]
struct ElevenLabsStreamRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

#[async_trait]
impl TtsProvider for ElevenLabsProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> crate::Result<AudioStream> {
        tracing::debug!(
            "ElevenLabs stream request: model={}, voice={}, format={}, input_len={}",
            request.model_id,
            request.voice_id,
            request.output_format,
            request.text.len(),
        );

        let body = ElevenLabsStreamRequest {
            text: &request.text,
            model_id: &request.model_id,
        };

        let builder = self.api.text_to_speech(request, "/stream").json(&body);
        let response = self.api.send(&self.name, builder).await?;

        let stream = response.bytes_stream().map_err(|e| {
            tracing::error!("ElevenLabs audio stream failed: {e}");
            TtsError::Stream(e.to_string())
        });

        Ok(Box::pin(stream))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
