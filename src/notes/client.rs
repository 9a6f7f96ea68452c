use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::NotesConfig;

/// Structured clinical note returned by the AI note-generation backend.
/// The full schema is owned by the backend; these are the sections this
/// core relies on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredNote {
    pub chief_complaint: String,
    pub history: String,
    pub assessment: String,
    pub plan: String,
}

#[derive(Debug, Error)]
pub enum NoteError {
    /// Local precondition; fails before any network call
    #[error("transcript is empty; nothing to generate notes from")]
    EmptyTranscript,

    #[error("note generation failed: {0}")]
    NoteGenerationFailed(String),
}

/// The note-generation collaborator the client delegates to
#[async_trait]
pub trait NoteBackend: Send + Sync {
    async fn request(&self, transcript: &str) -> Result<StructuredNote, NoteError>;
}

/// Thin pass-through to the AI note-generation endpoint
///
/// Guards the local precondition (never sends an empty transcript) and
/// otherwise forwards to the backend. No retry loop; the caller decides
/// whether to try again.
pub struct NoteGenerationClient {
    backend: std::sync::Arc<dyn NoteBackend>,
}

impl NoteGenerationClient {
    pub fn new(backend: std::sync::Arc<dyn NoteBackend>) -> Self {
        Self { backend }
    }

    pub async fn generate(&self, transcript: &str) -> Result<StructuredNote, NoteError> {
        let trimmed = transcript.trim();
        if trimmed.is_empty() {
            return Err(NoteError::EmptyTranscript);
        }

        let note = self.backend.request(trimmed).await?;

        info!("Structured note generated ({} chars of transcript)", trimmed.len());

        Ok(note)
    }
}

#[derive(Debug, Serialize)]
struct NoteRequest<'a> {
    transcript: &'a str,
}

/// HTTP note-generation backend
pub struct HttpNoteBackend {
    client: reqwest::Client,
    settings: NotesConfig,
}

impl HttpNoteBackend {
    pub fn new(settings: NotesConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client, settings }
    }
}

#[async_trait]
impl NoteBackend for HttpNoteBackend {
    /// One request carrying the transcript; any remote failure (network
    /// error, non-success status, malformed payload) folds into a
    /// single `NoteGenerationFailed` with the underlying message.
    async fn request(&self, transcript: &str) -> Result<StructuredNote, NoteError> {
        let mut request = self
            .client
            .post(&self.settings.endpoint)
            .json(&NoteRequest { transcript });

        if let Some(token) = &self.settings.bearer_token {
            if !token.is_empty() {
                request = request.bearer_auth(token);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| NoteError::NoteGenerationFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NoteError::NoteGenerationFailed(format!(
                "{}: {}",
                status, detail
            )));
        }

        response
            .json::<StructuredNote>()
            .await
            .map_err(|e| NoteError::NoteGenerationFailed(format!("malformed response: {}", e)))
    }
}
