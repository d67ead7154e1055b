use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// Ordered audio chunks from a provider or the transcoder
pub type AudioStream = Pin<Box<dyn Stream<Item = crate::Result<Bytes>> + Send>>;

/// One synthesis call as seen by a provider
///
/// Only `text` comes from the caller; the rest is fixed by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    /// Text to synthesize, passed through unmodified
    pub text: String,
    /// Voice identifier
    pub voice_id: String,
    /// Model identifier
    pub model_id: String,
    /// Provider-native output format (e.g. `pcm_8000`)
    pub output_format: String,
}
