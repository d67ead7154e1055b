use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};

use axum::{body::Body, response::Response};
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, stream};
use http::{HeaderValue, StatusCode, header};
use relay_config::{Config, DeliveryMode, TtsProviderConfig, TtsProviderType};
use relay_telemetry::{TtsMetrics, metrics::record_duration};

use crate::{
    error::TtsError,
    frame,
    http_client::http_client,
    provider::{TtsProvider, elevenlabs::ElevenLabsProvider, elevenlabs_http::ElevenLabsHttpProvider},
    transcode::Transcoder,
    types::{AudioStream, SpeechRequest},
};

/// Relays text to the configured provider and shapes the audio response
pub struct TtsService {
    provider: Arc<dyn TtsProvider>,
    transcoder: Option<Transcoder>,
    delivery: DeliveryMode,
    content_type: HeaderValue,
    voice_id: String,
    model_id: String,
    output_format: String,
    metrics: TtsMetrics,
}

impl TtsService {
    /// Synthesize `text` and build the streamed audio response
    ///
    /// Errors returned here happen before the response is committed and
    /// become a 500. Failures after the first byte end the body with an
    /// error, which aborts the connection.
    pub async fn respond(&self, text: String) -> crate::Result<Response> {
        let started = Instant::now();

        let request = SpeechRequest {
            text,
            voice_id: self.voice_id.clone(),
            model_id: self.model_id.clone(),
            output_format: self.output_format.clone(),
        };

        tracing::info!(
            provider = self.provider.name(),
            model = %request.model_id,
            voice = %request.voice_id,
            format = %request.output_format,
            text_len = request.text.len(),
            "processing TTS request"
        );

        match self.audio_body(&request, started).await {
            Ok(body) => self.audio_response(body),
            Err(e) => {
                self.metrics.record_outcome("failed");
                Err(e)
            }
        }
    }

    /// Count a request rejected during validation
    pub fn record_rejected(&self) {
        self.metrics.record_outcome("rejected");
    }

    async fn audio_body(&self, request: &SpeechRequest, started: Instant) -> crate::Result<Body> {
        let mut audio = self.provider.synthesize(request).await?;

        if let Some(ref transcoder) = self.transcoder {
            audio = transcoder.transcode(audio)?;
        }

        let output: AudioStream = match self.delivery {
            DeliveryMode::Chunked => {
                let buffer = collect(audio).await?;
                tracing::debug!(bytes = buffer.len(), frames = buffer.len().div_ceil(frame::FRAME_SIZE), "audio buffered");
                Box::pin(stream::iter(frame::frames(buffer).map(Ok)))
            }
            DeliveryMode::Streaming => match first_chunk(&mut audio).await? {
                Some(first) => Box::pin(stream::once(async move { Ok(first) }).chain(audio)),
                None => Box::pin(stream::empty()),
            },
        };

        record_duration(&self.metrics.time_to_first_byte, started, &[]);

        Ok(Body::from_stream(Metered {
            inner: output,
            metrics: self.metrics.clone(),
            started,
            written: 0,
            finished: false,
        }))
    }

    fn audio_response(&self, body: Body) -> crate::Result<Response> {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.content_type.clone())
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(header::CONNECTION, HeaderValue::from_static("keep-alive"))
            .body(body)
            .map_err(|e| {
                tracing::error!("Failed to build audio response: {e}");
                TtsError::InternalError
            })
    }
}

/// Buffer an entire audio stream
async fn collect(mut audio: AudioStream) -> crate::Result<Bytes> {
    let mut buffer = BytesMut::new();

    while let Some(chunk) = audio.next().await {
        buffer.extend_from_slice(&chunk?);
    }

    Ok(buffer.freeze())
}

/// Wait for the first non-empty chunk, surfacing any error before it
async fn first_chunk(audio: &mut AudioStream) -> crate::Result<Option<Bytes>> {
    while let Some(chunk) = audio.next().await {
        let chunk = chunk?;
        if !chunk.is_empty() {
            return Ok(Some(chunk));
        }
    }

    Ok(None)
}

/// Response body stream recording completion, aborts and disconnects
struct Metered {
    inner: AudioStream,
    metrics: TtsMetrics,
    started: Instant,
    written: u64,
    finished: bool,
}

impl Stream for Metered {
    type Item = crate::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.poll_next_unpin(cx);

        match &polled {
            Poll::Ready(Some(Ok(chunk))) => {
                self.written += chunk.len() as u64;
                self.metrics.audio_bytes.add(chunk.len() as u64, &[]);
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::error!(
                    kind = e.kind(),
                    written = self.written,
                    "audio failed after streaming began, aborting response: {e}"
                );
                self.finished = true;
                self.metrics.record_outcome("aborted");
            }
            Poll::Ready(None) if !self.finished => {
                tracing::debug!(bytes = self.written, "TTS response complete");
                self.finished = true;
                self.metrics.record_outcome("ok");
                record_duration(&self.metrics.duration, self.started, &[]);
            }
            Poll::Ready(None) | Poll::Pending => {}
        }

        polled
    }
}

impl Drop for Metered {
    fn drop(&mut self) {
        if !self.finished {
            tracing::info!(bytes = self.written, "client disconnected, cancelling synthesis");
            self.metrics.record_outcome("cancelled");
        }
    }
}

/// Builder for constructing the TTS service from configuration
pub struct TtsServiceBuilder<'a> {
    config: &'a Config,
    provider: Option<Arc<dyn TtsProvider>>,
    transcoder: Option<Transcoder>,
}

impl<'a> TtsServiceBuilder<'a> {
    pub const fn new(config: &'a Config) -> Self {
        Self {
            config,
            provider: None,
            transcoder: None,
        }
    }

    /// Use `provider` instead of the one named in the configuration
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn TtsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Use `transcoder` instead of one built from `[transcode]`
    #[must_use]
    pub fn with_transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = Some(transcoder);
        self
    }

    pub fn build(self) -> crate::Result<TtsService> {
        let tts = &self.config.tts;

        let provider = match self.provider {
            Some(provider) => provider,
            None => build_provider(&tts.provider)?,
        };

        let transcoder = self
            .transcoder
            .or_else(|| self.config.transcode.as_ref().map(Transcoder::from_config));

        let content_type = self
            .config
            .transcode
            .as_ref()
            .map_or(tts.content_type.as_str(), |t| t.content_type.as_str());
        let content_type = HeaderValue::from_str(content_type)
            .map_err(|e| TtsError::ConfigError(format!("invalid content type '{content_type}': {e}")))?;

        tracing::debug!(
            "TTS service initialized: provider={}, delivery={:?}, transcoding={}",
            provider.name(),
            tts.delivery,
            transcoder.is_some(),
        );

        Ok(TtsService {
            provider,
            transcoder,
            delivery: tts.delivery,
            content_type,
            voice_id: tts.provider.voice_id.clone(),
            model_id: tts.provider.model_id.clone(),
            output_format: tts.provider.output_format.clone(),
            metrics: TtsMetrics::new(),
        })
    }
}

fn build_provider(config: &TtsProviderConfig) -> crate::Result<Arc<dyn TtsProvider>> {
    let client = http_client(config.connect_timeout, config.read_timeout)
        .map_err(|e| TtsError::ConfigError(format!("failed to build HTTP client: {e}")))?;

    let provider: Arc<dyn TtsProvider> = match config.provider_type {
        TtsProviderType::Elevenlabs => Arc::new(ElevenLabsProvider::new(
            "elevenlabs".to_string(),
            client,
            config.api_key.clone(),
            config.base_url.as_ref(),
        )),
        TtsProviderType::ElevenlabsHttp => Arc::new(ElevenLabsHttpProvider::new(
            "elevenlabs_http".to_string(),
            client,
            config.api_key.clone(),
            config.base_url.as_ref(),
            config.voice_settings.clone(),
        )),
    };

    Ok(provider)
}
