use futures::future::join_all;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

use super::batch::BatchTranscribe;
use super::streaming::{ChannelEvent, StreamingChannel};
use super::TranscribeError;
use crate::audio::{AudioChunk, AudioSegment};
use crate::config::StreamSettings;

/// Active transcription strategy
///
/// Selected lazily on first use. The only transitions are
/// `Unselected → Streaming`, `Unselected → Batch` and the one-way
/// downgrade `Streaming → Batch`; a session never upgrades back to
/// streaming on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Unselected,
    Streaming,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Outcome of one segment's transcription within a `transcribe()` call
#[derive(Debug, Clone)]
pub struct TranscriptionAttempt {
    pub segment_id: Uuid,
    pub status: AttemptStatus,
    pub text: Option<String>,
    pub error: Option<String>,
}

/// Deterministic, order-preserving concatenation of all successfully
/// transcribed segments
#[derive(Debug, Clone)]
pub struct CombinedTranscript {
    pub text: String,
    pub attempts: Vec<TranscriptionAttempt>,
}

/// Best-effort live transcript accumulated from incremental events:
/// finals are appended, the latest partial replaces the previous one.
#[derive(Debug, Default)]
struct LivePreview {
    finals: Vec<String>,
    partial: String,
}

impl LivePreview {
    fn render(&self) -> String {
        let mut lines: Vec<&str> = self.finals.iter().map(|s| s.as_str()).collect();
        if !self.partial.is_empty() {
            lines.push(&self.partial);
        }
        lines.join("\n")
    }
}

/// Decides how audio reaches the transcription service and merges
/// multi-segment transcripts deterministically.
///
/// The streaming channel only ever feeds the live preview; the
/// authoritative transcript handed to note generation is always derived
/// from the finalized, ordered segment list via the batch path.
pub struct TranscriptionOrchestrator {
    batch: Arc<dyn BatchTranscribe>,
    stream_settings: StreamSettings,
    strategy: AtomicU8,
    streaming: Mutex<Option<StreamingChannel>>,
    live: Mutex<LivePreview>,
    notice_emitted: AtomicBool,
    offline_notice: Mutex<Option<String>>,
}

impl TranscriptionOrchestrator {
    pub fn new(batch: Arc<dyn BatchTranscribe>, stream_settings: StreamSettings) -> Self {
        Self {
            batch,
            stream_settings,
            strategy: AtomicU8::new(Strategy::Unselected as u8),
            streaming: Mutex::new(None),
            live: Mutex::new(LivePreview::default()),
            notice_emitted: AtomicBool::new(false),
            offline_notice: Mutex::new(None),
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self.strategy.load(Ordering::SeqCst) {
            0 => Strategy::Unselected,
            1 => Strategy::Streaming,
            _ => Strategy::Batch,
        }
    }

    fn set_strategy(&self, strategy: Strategy) {
        self.strategy.store(strategy as u8, Ordering::SeqCst);
    }

    /// Lazily pick the channel strategy on first use
    ///
    /// Attempts the streaming connection once; failure selects batch for
    /// the whole session. A no-op when a strategy is already active.
    pub async fn ensure_strategy(self: Arc<Self>, session_id: &str) {
        if self.strategy() != Strategy::Unselected {
            return;
        }

        match StreamingChannel::connect(&self.stream_settings, session_id).await {
            Ok((channel, events_rx)) => {
                {
                    let mut streaming = self.streaming.lock().await;
                    *streaming = Some(channel);
                }
                self.set_strategy(Strategy::Streaming);
                info!("Streaming transcription active for {}", session_id);

                let orchestrator = Arc::clone(&self);
                tokio::spawn(async move {
                    orchestrator.watch_channel(events_rx).await;
                });
            }
            Err(e) => {
                self.downgrade(&format!("streaming connect failed: {}", e))
                    .await;
            }
        }
    }

    async fn watch_channel(self: Arc<Self>, mut events_rx: mpsc::Receiver<ChannelEvent>) {
        while let Some(event) = events_rx.recv().await {
            self.handle_event(event).await;
        }
    }

    /// Apply one channel signal. Exposed for the channel watcher task.
    pub async fn handle_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                info!("Streaming channel connected");
            }
            ChannelEvent::Transcript { text, is_final } => {
                let mut live = self.live.lock().await;
                if is_final {
                    live.finals.push(text);
                    live.partial.clear();
                } else {
                    live.partial = text;
                }
            }
            ChannelEvent::Degraded { attempt } => {
                warn!("Streaming channel degraded (probe attempt {})", attempt);
            }
            ChannelEvent::Closed { reason } => {
                self.downgrade(&reason).await;
            }
        }
    }

    /// Permanently switch to batch for the remainder of the session
    ///
    /// Emits the user-facing offline notice exactly once, however many
    /// times the downgrade path is hit.
    pub async fn downgrade(&self, reason: &str) {
        self.set_strategy(Strategy::Batch);

        {
            let mut streaming = self.streaming.lock().await;
            if let Some(mut channel) = streaming.take() {
                channel.close();
            }
        }

        if !self.notice_emitted.swap(true, Ordering::SeqCst) {
            let notice = format!(
                "Live transcription is unavailable ({}); continuing in offline mode. \
                 Recorded segments will be transcribed when you finish.",
                reason
            );
            warn!("{}", notice);
            let mut offline_notice = self.offline_notice.lock().await;
            *offline_notice = Some(notice);
        }
    }

    /// One-time downgrade notice for the UI, if the session went offline
    pub async fn offline_notice(&self) -> Option<String> {
        self.offline_notice.lock().await.clone()
    }

    /// Best-effort push of live audio into the streaming channel
    ///
    /// Skipped silently unless the streaming strategy is active and the
    /// channel is healthy; publish failures are logged and absorbed.
    pub async fn push_live_audio(&self, chunk: &AudioChunk, final_frame: bool) {
        if self.strategy() != Strategy::Streaming {
            return;
        }

        let streaming = self.streaming.lock().await;
        if let Some(channel) = streaming.as_ref() {
            if !channel.is_healthy() {
                return;
            }

            let pcm_bytes: Vec<u8> = chunk
                .samples
                .iter()
                .flat_map(|s| s.to_le_bytes())
                .collect();

            if let Err(e) = channel
                .send_audio(&pcm_bytes, chunk.sample_rate, chunk.channels, final_frame)
                .await
            {
                warn!("Failed to push live audio frame: {}", e);
            }
        }
    }

    /// Publish the empty final-frame marker that ends one segment's
    /// live audio stream. Best-effort, like the frames before it.
    pub async fn finish_live_segment(&self, sample_rate: u32, channels: u16) {
        if self.strategy() != Strategy::Streaming {
            return;
        }

        let streaming = self.streaming.lock().await;
        if let Some(channel) = streaming.as_ref() {
            if !channel.is_healthy() {
                return;
            }
            if let Err(e) = channel.send_audio(&[], sample_rate, channels, true).await {
                warn!("Failed to publish final frame marker: {}", e);
            }
        }
    }

    /// Latest accumulated live transcript text
    pub async fn live_preview(&self) -> String {
        self.live.lock().await.render()
    }

    /// Produce the authoritative combined transcript from the finalized,
    /// ordered segment list.
    ///
    /// Dispatch runs concurrently across segments for latency, but
    /// results are reassembled in segment order: clinical transcripts
    /// must read in chronological speech order even when a later
    /// segment's request completes first. Exactly one attempt per
    /// segment; a failed segment is skipped, not retried, and never
    /// aborts the rest.
    pub async fn transcribe(
        &self,
        segments: &[AudioSegment],
    ) -> Result<CombinedTranscript, TranscribeError> {
        info!("Transcribing {} segment(s) via batch channel", segments.len());

        let requests = segments.iter().map(|segment| {
            let batch = Arc::clone(&self.batch);
            async move { batch.send(segment).await }
        });

        // join_all yields results in input order regardless of
        // completion order
        let results = join_all(requests).await;

        let mut attempts = Vec::with_capacity(segments.len());
        let mut successes: Vec<String> = Vec::new();

        for (segment, result) in segments.iter().zip(results) {
            match result {
                Ok(text) => {
                    successes.push(text.clone());
                    attempts.push(TranscriptionAttempt {
                        segment_id: segment.id,
                        status: AttemptStatus::Succeeded,
                        text: Some(text),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("Segment {} failed transcription: {}", segment.id, e);
                    attempts.push(TranscriptionAttempt {
                        segment_id: segment.id,
                        status: AttemptStatus::Failed,
                        text: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        if successes.is_empty() {
            return Err(TranscribeError::NoValidTranscription);
        }

        Ok(CombinedTranscript {
            text: successes.join("\n\n"),
            attempts,
        })
    }
}
