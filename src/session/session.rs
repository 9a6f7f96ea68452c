use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use super::config::ConsultationConfig;
use super::stats::SessionStats;
use crate::audio::{
    CaptureDevice, RecordError, RecordState, SegmentRecorder, SegmentStore, SegmentSummary,
};
use crate::config::StreamSettings;
use crate::notes::{NoteError, NoteGenerationClient, StructuredNote};
use crate::persist::ConsultationStore;
use crate::transcribe::{
    BatchTranscribe, CombinedTranscript, TranscribeError, TranscriptionOrchestrator,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Transcribe(#[from] TranscribeError),

    #[error(transparent)]
    Note(#[from] NoteError),

    #[error("session was reset while transcription was in flight; result discarded")]
    ResetDuringTranscription,

    #[error("no transcript has been saved for this consultation yet")]
    MissingTranscript,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One consultation's recording and transcription state
///
/// Owns the single capture-device handle and streaming connection for
/// the consultation, wires the recorder's live tap into the
/// orchestrator, and drives the authoritative transcribe/notes flow
/// against the persistence collaborator.
pub struct ConsultationSession {
    config: ConsultationConfig,
    store: Arc<Mutex<SegmentStore>>,
    recorder: Mutex<SegmentRecorder>,
    orchestrator: Arc<TranscriptionOrchestrator>,
    persist: Arc<dyn ConsultationStore>,
    notes: Arc<NoteGenerationClient>,
    started_at: chrono::DateTime<Utc>,
}

impl ConsultationSession {
    pub fn new(
        config: ConsultationConfig,
        device: Box<dyn CaptureDevice>,
        batch: Arc<dyn BatchTranscribe>,
        stream_settings: StreamSettings,
        persist: Arc<dyn ConsultationStore>,
        notes: Arc<NoteGenerationClient>,
    ) -> Arc<Self> {
        info!("Creating consultation session: {}", config.consultation_id);

        let store = Arc::new(Mutex::new(SegmentStore::new(config.recordings_dir.clone())));

        let mut recorder = SegmentRecorder::new(
            device,
            Arc::clone(&store),
            config.constraints.clone(),
            config.min_segment_bytes,
        );

        let orchestrator = Arc::new(TranscriptionOrchestrator::new(batch, stream_settings));

        // Live tap: normalized chunks flow to the streaming channel for
        // the best-effort preview
        let (tap_tx, mut tap_rx) = mpsc::channel(100);
        recorder.set_live_tap(tap_tx);

        let live_orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            while let Some(chunk) = tap_rx.recv().await {
                live_orchestrator.push_live_audio(&chunk, false).await;
            }
        });

        Arc::new(Self {
            config,
            store,
            recorder: Mutex::new(recorder),
            orchestrator,
            persist,
            notes,
            started_at: Utc::now(),
        })
    }

    pub fn consultation_id(&self) -> &str {
        &self.config.consultation_id
    }

    /// Begin recording a new segment
    ///
    /// The channel strategy is selected lazily on the first start.
    pub async fn start_recording(&self) -> Result<(), SessionError> {
        Arc::clone(&self.orchestrator)
            .ensure_strategy(&self.config.consultation_id)
            .await;

        let mut recorder = self.recorder.lock().await;
        recorder.start().await?;
        Ok(())
    }

    /// Stop recording and finalize the buffered audio into one segment
    pub async fn stop_recording(&self) -> Result<SegmentSummary, SessionError> {
        let summary = {
            let mut recorder = self.recorder.lock().await;
            recorder.stop().await?
        };

        // Mark the end of the live audio stream for this segment
        self.orchestrator
            .finish_live_segment(
                self.config.constraints.sample_rate,
                self.config.constraints.channels,
            )
            .await;

        Ok(summary)
    }

    pub async fn segments(&self) -> Vec<SegmentSummary> {
        self.store.lock().await.summaries()
    }

    pub async fn segment_audio(&self, id: Uuid) -> Option<(String, Vec<u8>)> {
        self.store.lock().await.bytes_of(id)
    }

    /// Idempotent: deleting an unknown id is a no-op
    pub async fn delete_segment(&self, id: Uuid) -> bool {
        self.store.lock().await.delete_by_id(id)
    }

    pub async fn reset(&self) {
        self.store.lock().await.reset();
    }

    pub async fn live_preview(&self) -> String {
        self.orchestrator.live_preview().await
    }

    /// Produce the authoritative combined transcript and persist it
    ///
    /// A result that lands after the store was reset mid-flight is
    /// discarded rather than saved against a stale segment list.
    pub async fn transcribe_and_save(&self) -> Result<CombinedTranscript, SessionError> {
        let (generation, segments) = {
            let store = self.store.lock().await;
            (store.generation(), store.all())
        };

        let combined = self.orchestrator.transcribe(&segments).await?;

        {
            let store = self.store.lock().await;
            if store.generation() != generation {
                warn!(
                    "Discarding transcription result for {}: store was reset mid-flight",
                    self.config.consultation_id
                );
                return Err(SessionError::ResetDuringTranscription);
            }
        }

        self.persist
            .save_transcript(&self.config.consultation_id, &combined.text)
            .await?;

        Ok(combined)
    }

    /// Generate structured notes from the saved transcript and persist
    /// them
    pub async fn generate_notes(&self) -> Result<StructuredNote, SessionError> {
        let transcript = self
            .persist
            .transcript(&self.config.consultation_id)
            .await
            .ok_or(SessionError::MissingTranscript)?;

        let note = self.notes.generate(&transcript).await?;

        self.persist
            .save_notes(&self.config.consultation_id, &note)
            .await?;

        Ok(note)
    }

    pub async fn stats(&self) -> SessionStats {
        let (is_recording, elapsed_secs) = {
            let recorder = self.recorder.lock().await;
            (
                recorder.state() == RecordState::Recording,
                recorder.elapsed_seconds(),
            )
        };

        let (segment_count, combined_duration_secs) = {
            let store = self.store.lock().await;
            (store.len(), store.combined_duration_seconds())
        };

        let strategy = match self.orchestrator.strategy() {
            crate::transcribe::Strategy::Unselected => "unselected",
            crate::transcribe::Strategy::Streaming => "streaming",
            crate::transcribe::Strategy::Batch => "batch",
        };

        SessionStats {
            consultation_id: self.config.consultation_id.clone(),
            is_recording,
            started_at: self.started_at,
            elapsed_secs,
            segment_count,
            combined_duration_secs,
            strategy: strategy.to_string(),
            offline_notice: self.orchestrator.offline_notice().await,
        }
    }
}
