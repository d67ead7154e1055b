use axum::body::Body;
use serde::Deserialize;
use serde_json::Value;

use crate::error::TtsError;

/// Body limit for TTS requests (1 MiB)
const BODY_LIMIT_BYTES: usize = 1 << 20;

/// Extractor yielding the validated, non-empty `text` of a request
///
/// Rejections happen before any provider call: a missing, empty or
/// non-string `text` gives `400 {"message":"Text is required"}`.
#[derive(Debug)]
pub struct ExtractText(pub String);

#[derive(Deserialize)]
struct TextPayload {
    #[serde(default)]
    text: Value,
}

impl<S> axum::extract::FromRequest<S> for ExtractText
where
    S: Send + Sync,
{
    type Rejection = TtsError;

    async fn from_request(request: http::Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(request.into_body(), BODY_LIMIT_BYTES)
            .await
            .map_err(|err| {
                if std::error::Error::source(&err)
                    .is_some_and(|source| source.is::<http_body_util::LengthLimitError>())
                {
                    TtsError::InvalidRequest(format!("request body is too large, limit is {BODY_LIMIT_BYTES} bytes"))
                } else {
                    TtsError::InvalidRequest(format!("failed to read request body: {err}"))
                }
            })?;

        parse_text(&bytes).map(Self)
    }
}

/// Pull `text` out of a JSON body
fn parse_text(bytes: &[u8]) -> crate::Result<String> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(TtsError::MissingText);
    }

    let value: Value = serde_json::from_slice(bytes).map_err(|e| TtsError::InvalidRequest(e.to_string()))?;

    // Bodies that are valid JSON but not an object carry no text
    let Ok(payload) = serde_json::from_value::<TextPayload>(value) else {
        return Err(TtsError::MissingText);
    };

    match payload.text {
        Value::String(text) if !text.is_empty() => Ok(text),
        _ => Err(TtsError::MissingText),
    }
}
