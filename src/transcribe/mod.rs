//! Transcription orchestration
//!
//! Two transport strategies move audio to the transcription service:
//! a persistent streaming channel feeding a best-effort live preview,
//! and a per-segment batch channel that produces the authoritative
//! combined transcript. The orchestrator selects between them and fails
//! over one-way from streaming to batch.

pub mod batch;
pub mod messages;
pub mod orchestrator;
pub mod streaming;

use thiserror::Error;

pub use batch::{BatchTranscribe, HttpBatchChannel};
pub use messages::{AudioFrameMessage, BatchRequest, BatchResponse, StreamEvent, StreamStatus};
pub use orchestrator::{
    AttemptStatus, CombinedTranscript, Strategy, TranscriptionAttempt, TranscriptionOrchestrator,
};
pub use streaming::{ChannelEvent, ChannelState, StreamError, StreamingChannel};

/// Transcription failures
///
/// The first three are per-segment: the attempt is marked failed and
/// processing continues. `NoValidTranscription` is the aggregate error
/// raised only when every segment failed; a `transcribe()` call never
/// returns an empty transcript as success.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("transcription request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transcription backend rejected segment: {0}")]
    BackendRejected(String),

    #[error("no segment produced a valid transcription")]
    NoValidTranscription,
}
