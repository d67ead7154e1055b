use std::path::Path;

use secrecy::ExposeSecret;

use crate::{Config, TranscodeInput, transcode::is_headerless};

/// Template used by [`Config::from_env`]
const ENV_TEMPLATE: &str = include_str!("default.toml");

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Build configuration purely from environment variables
    ///
    /// Reads `ELEVENLABS_API_KEY`, `ELEVENLABS_VOICE_ID`,
    /// `ELEVENLABS_MODEL_ID` and `PORT`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is unset or a value is invalid
    pub fn from_env() -> anyhow::Result<Self> {
        Self::parse(ENV_TEMPLATE)
    }

    /// Parse configuration text, expanding placeholders first
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let mut config: Self =
            toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.describe_transcode_input();
        config.validate()?;

        tracing::debug!(
            provider = ?config.tts.provider.provider_type,
            delivery = ?config.tts.delivery,
            transcode = config.transcode.is_some(),
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if provider credentials are blank or the
    /// transcoding target is unusable
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_provider()?;
        self.validate_transcode()?;
        Ok(())
    }

    /// Fill in `[transcode.input]` from a headerless provider format
    fn describe_transcode_input(&mut self) {
        let output_format = &self.tts.provider.output_format;

        if let Some(ref mut transcode) = self.transcode
            && transcode.input.is_none()
        {
            transcode.input = TranscodeInput::for_output_format(output_format);
        }
    }

    fn validate_provider(&self) -> anyhow::Result<()> {
        let provider = &self.tts.provider;

        if provider.api_key.expose_secret().trim().is_empty() {
            anyhow::bail!("tts.provider.api_key must not be empty");
        }

        if provider.voice_id.trim().is_empty() {
            anyhow::bail!("tts.provider.voice_id must not be empty");
        }

        if provider.model_id.trim().is_empty() {
            anyhow::bail!("tts.provider.model_id must not be empty");
        }

        if provider.connect_timeout.is_zero() || provider.read_timeout.is_zero() {
            anyhow::bail!("tts.provider timeouts must be greater than zero");
        }

        Ok(())
    }

    fn validate_transcode(&self) -> anyhow::Result<()> {
        let Some(ref transcode) = self.transcode else {
            return Ok(());
        };

        if transcode.sample_rate == 0 {
            anyhow::bail!("transcode.sample_rate must be greater than 0");
        }

        if transcode.codec.trim().is_empty() || transcode.container.trim().is_empty() {
            anyhow::bail!("transcode.codec and transcode.container must not be empty");
        }

        match transcode.input {
            Some(ref input) if input.sample_rate == 0 || input.channels == 0 => {
                anyhow::bail!("transcode.input sample_rate and channels must be greater than 0");
            }
            None if is_headerless(&self.tts.provider.output_format) => {
                anyhow::bail!(
                    "transcode.input is required for headerless provider format '{}'",
                    self.tts.provider.output_format
                );
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, net::SocketAddr};

    use crate::{DeliveryMode, TtsProviderType};

    use super::*;

    const REQUIRED: [(&str, Option<&str>); 2] = [
        ("ELEVENLABS_API_KEY", Some("secret")),
        ("ELEVENLABS_VOICE_ID", Some("voice-1")),
    ];

    #[test]
    fn from_env_applies_documented_defaults() {
        temp_env::with_vars(REQUIRED, || {
            temp_env::with_vars_unset(["PORT", "ELEVENLABS_MODEL_ID", "TTS_DELIVERY"], || {
                let config = Config::from_env().unwrap();

                assert_eq!(config.server.listen_address, SocketAddr::from(([0, 0, 0, 0], 6007)));
                assert_eq!(config.tts.provider.provider_type, TtsProviderType::Elevenlabs);
                assert_eq!(config.tts.provider.voice_id, "voice-1");
                assert_eq!(config.tts.provider.model_id, "eleven_multilingual_v2");
                assert_eq!(config.tts.delivery, DeliveryMode::Chunked);
                assert!(config.transcode.is_none());
            });
        });
    }

    #[test]
    fn from_env_honours_overrides() {
        temp_env::with_vars(REQUIRED, || {
            let overrides = [
                ("PORT", Some("7100")),
                ("ELEVENLABS_MODEL_ID", Some("eleven_flash_v2_5")),
                ("TTS_DELIVERY", Some("streaming")),
            ];
            temp_env::with_vars(overrides, || {
                let config = Config::from_env().unwrap();

                assert_eq!(config.server.listen_address.port(), 7100);
                assert_eq!(config.tts.provider.model_id, "eleven_flash_v2_5");
                assert_eq!(config.tts.delivery, DeliveryMode::Streaming);
            });
        });
    }

    #[test]
    fn from_env_requires_api_key() {
        temp_env::with_var("ELEVENLABS_VOICE_ID", Some("voice-1"), || {
            temp_env::with_var_unset("ELEVENLABS_API_KEY", || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("ELEVENLABS_API_KEY"), "{err}");
            });
        });
    }

    #[test]
    fn blank_voice_is_rejected() {
        let err = Config::parse(
            r#"
            [tts.provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = " "
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("voice_id"));
    }

    #[test]
    fn zero_transcode_rate_is_rejected() {
        let err = Config::parse(
            r#"
            [tts.provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"

            [transcode]
            sample_rate = 0
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("sample_rate"));
    }

    #[test]
    fn headerless_pcm_is_described_to_the_transcoder() {
        let config = Config::parse(
            r#"
            [tts.provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"

            [transcode]
            "#,
        )
        .unwrap();

        let input = config.transcode.unwrap().input.unwrap();
        assert_eq!(input.format, "s16le");
        assert_eq!(input.sample_rate, 8000);
        assert_eq!(input.channels, 1);
    }

    #[test]
    fn ulaw_output_is_described_as_mulaw() {
        let config = Config::parse(
            r#"
            [tts.provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"
            output_format = "ulaw_8000"

            [transcode]
            "#,
        )
        .unwrap();

        let input = config.transcode.unwrap().input.unwrap();
        assert_eq!((input.format.as_str(), input.sample_rate), ("mulaw", 8000));
    }

    #[test]
    fn explicit_input_is_kept() {
        let config = Config::parse(
            r#"
            [tts.provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"
            output_format = "pcm_16000"

            [transcode]

            [transcode.input]
            format = "s16le"
            sample_rate = 22050
            "#,
        )
        .unwrap();

        assert_eq!(config.transcode.unwrap().input.unwrap().sample_rate, 22050);
    }

    #[test]
    fn undescribable_headerless_format_is_rejected() {
        let err = Config::parse(
            r#"
            [tts.provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"
            output_format = "pcm_high"

            [transcode]
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("transcode.input"), "{err}");
    }

    #[test]
    fn programmatic_headerless_transcode_fails_validation() {
        let mut config = Config::new(crate::TtsProviderConfig::elevenlabs("key", "voice"));
        config.transcode = Some(crate::TranscodeConfig::default());

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pcm_8000"), "{err}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::parse(
            r#"
            [tts]
            chunk_size = 160

            [tts.provider]
            type = "elevenlabs"
            api_key = "key"
            voice_id = "voice"
            "#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn loads_file_with_transcoding() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [server]
            listen_address = "127.0.0.1:9000"

            [server.health]
            enabled = false

            [tts]
            delivery = "streaming"

            [tts.provider]
            type = "elevenlabs_http"
            api_key = "key"
            voice_id = "voice"
            output_format = "mp3_44100_128"

            [transcode]
            sample_rate = 16000
            "#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        let transcode = config.transcode.unwrap();

        assert!(!config.server.health.enabled);
        assert_eq!(config.tts.provider.provider_type, TtsProviderType::ElevenlabsHttp);
        assert_eq!(transcode.sample_rate, 16000);
        assert_eq!(transcode.codec, "pcm_s16le");
        assert_eq!(transcode.container, "wav");
        assert_eq!(transcode.content_type, "audio/wav");
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = Config::load(Path::new("/nonexistent/tts-relay.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/tts-relay.toml"));
    }
}
