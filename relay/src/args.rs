use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Text-to-speech relay for telephony clients
#[derive(Debug, Parser)]
#[command(name = "tts-relay", about = "Relays text to ElevenLabs and streams the audio back")]
pub struct Args {
    /// Path to a configuration file; without one, settings come from the environment
    #[arg(short, long, env = "TTS_RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, env = "TTS_RELAY_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter used when `RUST_LOG` is unset
    #[arg(long, default_value = "info")]
    pub log: String,
}
