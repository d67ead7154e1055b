//! Metric names and the instruments used by the speech relay

use std::time::Instant;

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

pub const HTTP_REQUEST_DURATION: &str = "http.server.request.duration";

pub const TTS_REQUEST_COUNT: &str = "tts.request.count";
pub const TTS_REQUEST_DURATION: &str = "tts.request.duration";
pub const TTS_TIME_TO_FIRST_BYTE: &str = "tts.time_to_first_byte";
pub const TTS_AUDIO_BYTES: &str = "tts.audio.bytes";

/// Record a duration measurement on a histogram
pub fn record_duration(histogram: &Histogram<f64>, start: Instant, attributes: &[KeyValue]) {
    histogram.record(start.elapsed().as_secs_f64(), attributes);
}

/// Instruments recorded around each synthesis request
///
/// Built from the global meter provider, so they are no-ops until
/// [`crate::init`] installs an exporter.
#[derive(Clone)]
pub struct TtsMetrics {
    pub requests: Counter<u64>,
    pub duration: Histogram<f64>,
    pub time_to_first_byte: Histogram<f64>,
    pub audio_bytes: Counter<u64>,
}

impl TtsMetrics {
    pub fn new() -> Self {
        let meter = global::meter("tts-relay");

        Self {
            requests: meter
                .u64_counter(TTS_REQUEST_COUNT)
                .with_description("Speech synthesis requests by outcome")
                .build(),
            duration: meter
                .f64_histogram(TTS_REQUEST_DURATION)
                .with_unit("s")
                .with_description("Time until the audio response was fully produced")
                .build(),
            time_to_first_byte: meter
                .f64_histogram(TTS_TIME_TO_FIRST_BYTE)
                .with_unit("s")
                .with_description("Time until the first audio byte was available")
                .build(),
            audio_bytes: meter
                .u64_counter(TTS_AUDIO_BYTES)
                .with_unit("By")
                .with_description("Audio bytes written to clients")
                .build(),
        }
    }

    /// Count one request with its outcome (`ok`, `rejected`, `failed`, `aborted`, `cancelled`)
    pub fn record_outcome(&self, outcome: &'static str) {
        self.requests.add(1, &[KeyValue::new("outcome", outcome)]);
    }
}

impl Default for TtsMetrics {
    fn default() -> Self {
        Self::new()
    }
}
