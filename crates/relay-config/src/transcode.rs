use std::path::PathBuf;

use serde::Deserialize;

/// Audio transcoding stage driven by an external `ffmpeg` process
///
/// The output is always mono; the remaining target parameters are fixed for
/// the lifetime of the process.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscodeConfig {
    /// Path or name of the `ffmpeg` binary
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Output sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Output codec (`ffmpeg -acodec`)
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Output container (`ffmpeg -f`)
    #[serde(default = "default_container")]
    pub container: String,
    /// Content type advertised for the transcoded body
    #[serde(default = "default_content_type")]
    pub content_type: String,
    /// Description of the provider's audio, needed for headerless PCM
    #[serde(default)]
    pub input: Option<TranscodeInput>,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            sample_rate: default_sample_rate(),
            codec: default_codec(),
            container: default_container(),
            content_type: default_content_type(),
            input: None,
        }
    }
}

/// Raw input description passed to `ffmpeg` ahead of `-i`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranscodeInput {
    /// Demuxer name (e.g. `s16le`)
    pub format: String,
    /// Input sample rate in Hz
    pub sample_rate: u32,
    /// Input channel count
    #[serde(default = "default_channels")]
    pub channels: u16,
}

impl TranscodeInput {
    /// Describe a headerless provider format such as `pcm_8000` or `ulaw_8000`
    ///
    /// Returns `None` for self-describing formats (`mp3_*`, `opus_*`) and
    /// for headerless names whose rate cannot be read.
    pub fn for_output_format(output_format: &str) -> Option<Self> {
        let (encoding, rate) = output_format.split_once('_')?;

        let format = match encoding {
            "pcm" => "s16le",
            "ulaw" => "mulaw",
            "alaw" => "alaw",
            _ => return None,
        };

        Some(Self {
            format: format.to_string(),
            sample_rate: rate.parse().ok()?,
            channels: default_channels(),
        })
    }
}

/// Whether `output_format` carries no container ffmpeg could probe
pub fn is_headerless(output_format: &str) -> bool {
    ["pcm_", "ulaw_", "alaw_"]
        .iter()
        .any(|prefix| output_format.starts_with(prefix))
}

fn default_program() -> PathBuf {
    PathBuf::from("ffmpeg")
}

const fn default_sample_rate() -> u32 {
    8000
}

fn default_codec() -> String {
    "pcm_s16le".to_string()
}

fn default_container() -> String {
    "wav".to_string()
}

fn default_content_type() -> String {
    "audio/wav".to_string()
}

const fn default_channels() -> u16 {
    1
}
