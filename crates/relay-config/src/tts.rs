use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Model used when the configuration does not name one
pub const DEFAULT_MODEL_ID: &str = "eleven_multilingual_v2";

/// Provider-native format requested when none is configured (8 kHz PCM)
pub const DEFAULT_OUTPUT_FORMAT: &str = "pcm_8000";

/// Content type of untranscoded 8 kHz telephony audio
pub const DEFAULT_CONTENT_TYPE: &str = "audio/basic";

/// Top-level TTS configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsConfig {
    /// How synthesized audio is written to the response
    #[serde(default)]
    pub delivery: DeliveryMode,
    /// Content type advertised when no transcoder is configured
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// The upstream speech provider
    pub provider: TtsProviderConfig,
}

impl TtsConfig {
    pub fn new(provider: TtsProviderConfig) -> Self {
        Self {
            delivery: DeliveryMode::default(),
            content_type: default_content_type(),
            provider,
        }
    }
}

/// Response write strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Buffer the whole output, then write fixed 320-byte frames
    #[default]
    Chunked,
    /// Forward chunks as they arrive
    Streaming,
}

/// Configuration for the speech provider
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsProviderConfig {
    /// Provider transport
    #[serde(rename = "type")]
    pub provider_type: TtsProviderType,
    /// API key sent with every request
    pub api_key: SecretString,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Voice used for every request
    pub voice_id: String,
    /// Model used for every request
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Provider-native output format (e.g. `pcm_8000`, `mp3_44100_128`)
    #[serde(default = "default_output_format")]
    pub output_format: String,
    /// Voice tuning, only sent by the raw HTTP transport
    #[serde(default)]
    pub voice_settings: VoiceSettings,
    /// Time allowed to establish the upstream connection
    #[serde(default = "default_connect_timeout", deserialize_with = "deserialize_duration")]
    pub connect_timeout: Duration,
    /// Longest silence tolerated between upstream reads
    #[serde(default = "default_read_timeout", deserialize_with = "deserialize_duration")]
    pub read_timeout: Duration,
}

impl TtsProviderConfig {
    /// Streaming `ElevenLabs` provider with default settings
    pub fn elevenlabs(api_key: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            provider_type: TtsProviderType::Elevenlabs,
            api_key: SecretString::from(api_key.into()),
            base_url: None,
            voice_id: voice_id.into(),
            model_id: default_model_id(),
            output_format: default_output_format(),
            voice_settings: VoiceSettings::default(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
        }
    }
}

/// Supported provider transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProviderType {
    /// `ElevenLabs` streaming endpoint, consumed chunk by chunk
    Elevenlabs,
    /// `ElevenLabs` plain endpoint, one complete payload
    ElevenlabsHttp,
}

/// `ElevenLabs` voice tuning parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceSettings {
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default = "default_true")]
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            style: 0.0,
            use_speaker_boost: true,
        }
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn default_model_id() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}

const fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

const fn default_read_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_stability() -> f32 {
    0.5
}

const fn default_similarity_boost() -> f32 {
    0.75
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn minimal_provider_uses_defaults() {
        let config: TtsConfig = toml::from_str(
            r#"
            [provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"
            "#,
        )
        .unwrap();

        assert_eq!(config.delivery, DeliveryMode::Chunked);
        assert_eq!(config.content_type, "audio/basic");
        assert_eq!(config.provider.api_key.expose_secret(), "key");
        assert_eq!(config.provider.model_id, DEFAULT_MODEL_ID);
        assert_eq!(config.provider.output_format, "pcm_8000");
        assert_eq!(config.provider.voice_settings, VoiceSettings::default());
        assert_eq!(config.provider.read_timeout, Duration::from_secs(60));
    }

    #[test]
    fn parses_http_transport_with_voice_settings() {
        let config: TtsConfig = toml::from_str(
            r#"
            delivery = "streaming"

            [provider]
            type = "elevenlabs_http"
            api_key = "key"
            voice_id = "voice"
            model_id = "eleven_turbo_v2_5"
            connect_timeout = "2s"
            read_timeout = "1m"

            [provider.voice_settings]
            stability = 0.3
            style = 0.2
            use_speaker_boost = false
            "#,
        )
        .unwrap();

        assert_eq!(config.delivery, DeliveryMode::Streaming);
        assert_eq!(config.provider.provider_type, TtsProviderType::ElevenlabsHttp);
        assert_eq!(config.provider.model_id, "eleven_turbo_v2_5");
        assert_eq!(config.provider.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.provider.read_timeout, Duration::from_secs(60));
        assert!((config.provider.voice_settings.similarity_boost - 0.75).abs() < f32::EPSILON);
        assert!(!config.provider.voice_settings.use_speaker_boost);
    }

    #[test]
    fn rejects_bad_duration() {
        let result = toml::from_str::<TtsConfig>(
            r#"
            [provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"
            read_timeout = "soon"
            "#,
        );

        assert!(result.unwrap_err().to_string().contains("invalid duration"));
    }
}
