use async_trait::async_trait;
use base64::Engine;
use tracing::info;

use super::messages::{BatchRequest, BatchResponse};
use super::TranscribeError;
use crate::audio::AudioSegment;
use crate::config::BatchSettings;

/// Upload-and-wait transcription of one finalized segment.
///
/// Implementations are stateless per call and never retry: one
/// segment's failure must not affect submission of the next. Retry
/// policy, if any, belongs to the caller.
#[async_trait]
pub trait BatchTranscribe: Send + Sync {
    async fn send(&self, segment: &AudioSegment) -> Result<String, TranscribeError>;
}

/// HTTP batch channel
///
/// Posts one JSON request per segment to the transcription endpoint.
/// The per-request timeout comes from config; a bearer credential is
/// attached only when configured.
pub struct HttpBatchChannel {
    client: reqwest::Client,
    settings: BatchSettings,
}

impl HttpBatchChannel {
    pub fn new(settings: BatchSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, settings }
    }
}

impl From<reqwest::Error> for TranscribeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranscribeError::Timeout
        } else {
            TranscribeError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl BatchTranscribe for HttpBatchChannel {
    async fn send(&self, segment: &AudioSegment) -> Result<String, TranscribeError> {
        let body = BatchRequest {
            segment_id: segment.id.to_string(),
            audio: base64::engine::general_purpose::STANDARD.encode(&segment.bytes),
            media_type: segment.media_type.clone(),
        };

        let mut request = self.client.post(&self.settings.endpoint).json(&body);
        if let Some(token) = &self.settings.bearer_token {
            if !token.is_empty() {
                request = request.bearer_auth(token);
            }
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TranscribeError::BackendRejected(format!(
                "{}: {}",
                status, detail
            )));
        }

        let parsed: BatchResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::Transport(format!("malformed response: {}", e)))?;

        info!(
            "Segment {} transcribed ({} chars)",
            segment.id,
            parsed.text.len()
        );

        Ok(parsed.text)
    }
}
