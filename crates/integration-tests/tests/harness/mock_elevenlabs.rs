//! Mock `ElevenLabs` backend for integration tests
//!
//! Serves both text-to-speech endpoints and records every call

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing};
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

/// One call received by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: Option<String>,
    pub api_key: Option<String>,
    pub body: serde_json::Value,
}

/// How the mock answers
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Stream these chunks and finish cleanly
    Audio(Vec<Bytes>),
    /// Answer with an error status and body
    Fail(StatusCode, String),
    /// Send these chunks, then break the connection
    BreakAfter(Vec<Bytes>),
}

/// Mock `ElevenLabs` API
pub struct MockElevenLabs {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

struct MockState {
    request_count: AtomicU32,
    requests: Mutex<Vec<RecordedRequest>>,
    behavior: Behavior,
}

impl MockElevenLabs {
    /// Start a mock that streams `chunks`
    pub async fn start(chunks: Vec<Bytes>) -> anyhow::Result<Self> {
        Self::start_with(Behavior::Audio(chunks)).await
    }

    /// Start a mock that rejects every call with `status`
    pub async fn start_failing(status: StatusCode, body: &str) -> anyhow::Result<Self> {
        Self::start_with(Behavior::Fail(status, body.to_owned())).await
    }

    pub async fn start_with(behavior: Behavior) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            request_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
            behavior,
        });

        let app = Router::new()
            .route("/v1/text-to-speech/{voice_id}/stream", routing::post(handle_tts))
            .route("/v1/text-to-speech/{voice_id}", routing::post(handle_tts))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as the provider
    ///
    /// Includes `/v1` since the provider appends `/text-to-speech/...`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of synthesis requests received
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::Relaxed)
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("mock state poisoned").clone()
    }
}

impl Drop for MockElevenLabs {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn handle_tts(
    State(state): State<Arc<MockState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let api_key = headers
        .get("xi-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);

    state.requests.lock().expect("mock state poisoned").push(RecordedRequest {
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        api_key,
        body,
    });

    match state.behavior.clone() {
        Behavior::Audio(chunks) => {
            let chunks = stream::iter(chunks.into_iter().map(Ok::<_, Infallible>));
            (StatusCode::OK, [("content-type", "audio/basic")], Body::from_stream(chunks)).into_response()
        }
        Behavior::Fail(status, message) => (status, message).into_response(),
        Behavior::BreakAfter(chunks) => {
            // Give the relay time to receive the audio before the reset
            let reset = stream::once(async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "upstream reset"))
            });
            let items = stream::iter(chunks.into_iter().map(Ok)).chain(reset);
            (StatusCode::OK, [("content-type", "audio/basic")], Body::from_stream(items)).into_response()
        }
    }
}
