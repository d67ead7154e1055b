use async_trait::async_trait;
use relay_config::VoiceSettings;
use reqwest::Client;
use secrecy::SecretString;
use url::Url;

use crate::{
    error::TtsError,
    types::{AudioStream, SpeechRequest},
};

use super::{TtsProvider, elevenlabs::ElevenLabsApi};

/// `ElevenLabs` plain HTTP transport
///
/// Calls the non-streaming endpoint with explicit voice settings and yields
/// the complete payload as a single chunk.
pub struct ElevenLabsHttpProvider {
    api: ElevenLabsApi,
    voice_settings: VoiceSettings,
    name: String,
}

impl ElevenLabsHttpProvider {
    pub fn new(
        name: String,
        client: Client,
        api_key: SecretString,
        base_url: Option<&Url>,
        voice_settings: VoiceSettings,
    ) -> Self {
        Self {
            api: ElevenLabsApi::new(client, api_key, base_url),
            voice_settings,
            name,
        }
    }
}

#[derive(serde::Serialize)]
struct ElevenLabsRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: WireVoiceSettings,
}

#[derive(serde::Serialize)]
struct WireVoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

impl From<&VoiceSettings> for WireVoiceSettings {
    fn from(settings: &VoiceSettings) -> Self {
        Self {
            stability: settings.stability,
            similarity_boost: settings.similarity_boost,
            style: settings.style,
            use_speaker_boost: settings.use_speaker_boost,
        }
    }
}

#[async_trait]
impl TtsProvider for ElevenLabsHttpProvider {
    async fn synthesize(&self, request: &SpeechRequest) -> crate::Result<AudioStream> {
        tracing::debug!(
            "ElevenLabs TTS request: model={}, voice={}, format={}, input_len={}",
            request.model_id,
            request.voice_id,
            request.output_format,
            request.text.len(),
        );

        let body = ElevenLabsRequest {
            text: &request.text,
            model_id: &request.model_id,
            voice_settings: (&self.voice_settings).into(),
        };

        let builder = self.api.text_to_speech(request, "").json(&body);
        let response = self.api.send(&self.name, builder).await?;

        let audio = response.bytes().await.map_err(|e| {
            tracing::error!("Failed to read ElevenLabs response body: {e}");
            TtsError::Stream(e.to_string())
        })?;

        tracing::debug!("ElevenLabs TTS synthesis complete, {} bytes", audio.len());

        Ok(Box::pin(futures_util::stream::once(async move { Ok(audio) })))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
