#![allow(clippy::must_use_candidate)]

mod env;
pub mod health;
mod loader;
pub mod server;
pub mod telemetry;
pub mod transcode;
pub mod tts;

use serde::Deserialize;

pub use env::ExpandError;
pub use health::*;
pub use server::*;
pub use telemetry::TelemetryConfig;
pub use transcode::*;
pub use tts::*;

/// Top-level relay configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Speech synthesis configuration
    pub tts: TtsConfig,
    /// Optional audio transcoding stage
    #[serde(default)]
    pub transcode: Option<TranscodeConfig>,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}

impl Config {
    /// Minimal configuration around a single provider
    pub fn new(provider: TtsProviderConfig) -> Self {
        Self {
            server: ServerConfig::default(),
            tts: TtsConfig::new(provider),
            transcode: None,
            telemetry: None,
        }
    }
}
