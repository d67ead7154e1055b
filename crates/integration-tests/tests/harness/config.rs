//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use relay_config::{Config, DeliveryMode, TtsProviderConfig, TtsProviderType};

pub const TEST_API_KEY: &str = "test-key";
pub const TEST_VOICE_ID: &str = "test-voice";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with minimal defaults
    pub fn new() -> Self {
        let mut config = Config::new(TtsProviderConfig::elevenlabs(TEST_API_KEY, TEST_VOICE_ID));
        config.server.listen_address = SocketAddr::from(([127, 0, 0, 1], 0));

        Self { config }
    }

    /// Point the provider at a mock backend
    pub fn with_elevenlabs(mut self, base_url: &str) -> Self {
        self.config.tts.provider.base_url = Some(base_url.parse().expect("valid URL"));
        self
    }

    /// Use the non-streaming HTTP transport
    pub fn with_http_transport(mut self) -> Self {
        self.config.tts.provider.provider_type = TtsProviderType::ElevenlabsHttp;
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.config.tts.delivery = delivery;
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
