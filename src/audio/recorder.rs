use anyhow::{Context, Result};
use chrono::Utc;
use std::io::Cursor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::device::{AudioChunk, CaptureConstraints, CaptureDevice, DeviceError};
use super::segment::{AudioSegment, SegmentStore, SegmentSummary};

/// Recording session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    Idle,
    Recording,
    Stopping,
}

/// Errors surfaced by the recorder.
///
/// Device errors are terminal for that `start()` call only; segment
/// validity errors are terminal for that segment only. The session may
/// start a new segment immediately after either.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("no audio was captured; record the segment again")]
    NoAudioCaptured,

    #[error("captured audio is too small ({bytes} bytes, minimum {min_bytes}); record the segment again")]
    AudioTooSmall { bytes: usize, min_bytes: usize },

    #[error("no recording is active")]
    NotRecording,

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("failed to store segment: {0}")]
    Store(anyhow::Error),
}

/// Manages one continuous capture from the audio device and materializes
/// it into zero or more finalized segments.
///
/// The session clock starts when the recorder is created and keeps
/// running across segments; each `start()` only captures a new segment
/// mark, so a later segment's duration is measured from its own start,
/// not from the beginning of the session.
pub struct SegmentRecorder {
    device: Box<dyn CaptureDevice>,
    store: Arc<Mutex<SegmentStore>>,
    constraints: CaptureConstraints,
    min_segment_bytes: usize,
    state: RecordState,
    clock: Instant,
    segment_start: Duration,
    buffer: Arc<Mutex<Vec<i16>>>,
    buffer_task: Option<JoinHandle<()>>,
    live_tap: Option<mpsc::Sender<AudioChunk>>,
}

impl SegmentRecorder {
    pub fn new(
        device: Box<dyn CaptureDevice>,
        store: Arc<Mutex<SegmentStore>>,
        constraints: CaptureConstraints,
        min_segment_bytes: usize,
    ) -> Self {
        Self {
            device,
            store,
            constraints,
            min_segment_bytes,
            state: RecordState::Idle,
            clock: Instant::now(),
            segment_start: Duration::ZERO,
            buffer: Arc::new(Mutex::new(Vec::new())),
            buffer_task: None,
            live_tap: None,
        }
    }

    /// Forward normalized chunks to `tap` while recording (live preview)
    pub fn set_live_tap(&mut self, tap: mpsc::Sender<AudioChunk>) {
        self.live_tap = Some(tap);
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Seconds elapsed on the session's running clock
    pub fn elapsed_seconds(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }

    /// Acquire the input device and begin buffering a new segment
    ///
    /// Acquisition failures are terminal for this call; the session
    /// stays `Idle`. If a recording is already active, its stream is
    /// fully torn down first and its buffered audio discarded.
    pub async fn start(&mut self) -> Result<(), RecordError> {
        if self.state == RecordState::Recording {
            warn!("Recording already active; tearing down previous stream");
            self.teardown().await;
        }

        let chunk_rx = self.device.acquire(&self.constraints).await?;

        info!("Capture started on {}", self.device.name());

        self.segment_start = self.clock.elapsed();
        self.buffer.lock().await.clear();

        let buffer = Arc::clone(&self.buffer);
        let tap = self.live_tap.clone();
        let target_rate = self.constraints.sample_rate;
        let target_channels = self.constraints.channels;

        let task = tokio::spawn(async move {
            let mut chunk_rx = chunk_rx;
            while let Some(chunk) = chunk_rx.recv().await {
                let chunk = normalize_chunk(chunk, target_rate, target_channels);
                {
                    let mut buffer = buffer.lock().await;
                    buffer.extend_from_slice(&chunk.samples);
                }
                if let Some(tap) = &tap {
                    // Preview is best-effort; a gone listener never
                    // interrupts buffering
                    let _ = tap.send(chunk).await;
                }
            }
        });

        self.buffer_task = Some(task);
        self.state = RecordState::Recording;

        Ok(())
    }

    /// Flush buffered chunks and finalize them into one segment
    ///
    /// The device handle is released before any validity check runs, so
    /// it is guaranteed released once this call completes, regardless of
    /// outcome. Ends in `Idle` on every path.
    pub async fn stop(&mut self) -> Result<SegmentSummary, RecordError> {
        if self.state != RecordState::Recording {
            return Err(RecordError::NotRecording);
        }

        self.state = RecordState::Stopping;

        if let Err(e) = self.device.release().await {
            warn!("Device release reported an error: {}", e);
        }

        // Await the in-flight flush so every delivered chunk lands
        if let Some(task) = self.buffer_task.take() {
            if let Err(e) = task.await {
                error!("Buffer task panicked: {}", e);
            }
        }

        let samples = {
            let mut buffer = self.buffer.lock().await;
            std::mem::take(&mut *buffer)
        };

        self.state = RecordState::Idle;

        if samples.is_empty() {
            return Err(RecordError::NoAudioCaptured);
        }

        let bytes = encode_wav(&samples, self.constraints.sample_rate, self.constraints.channels)
            .map_err(RecordError::Store)?;

        if bytes.len() < self.min_segment_bytes {
            return Err(RecordError::AudioTooSmall {
                bytes: bytes.len(),
                min_bytes: self.min_segment_bytes,
            });
        }

        let duration = self.clock.elapsed() - self.segment_start;

        let segment = AudioSegment {
            id: Uuid::new_v4(),
            bytes,
            media_type: "audio/wav".to_string(),
            duration_seconds: duration.as_secs_f64(),
            captured_at: Utc::now(),
        };

        let summary = {
            let mut store = self.store.lock().await;
            store.append(segment).map_err(RecordError::Store)?
        };

        info!(
            "Segment finalized: {} ({:.1}s)",
            summary.id, summary.duration_seconds
        );

        Ok(summary)
    }

    /// Release the active stream and discard its partial buffer
    async fn teardown(&mut self) {
        if let Err(e) = self.device.release().await {
            warn!("Device release reported an error: {}", e);
        }
        if let Some(task) = self.buffer_task.take() {
            if let Err(e) = task.await {
                error!("Buffer task panicked: {}", e);
            }
        }
        let discarded = {
            let mut buffer = self.buffer.lock().await;
            let n = buffer.len();
            buffer.clear();
            n
        };
        if discarded > 0 {
            warn!("Discarded {} buffered samples from abandoned segment", discarded);
        }
        self.state = RecordState::Idle;
    }
}

/// Normalize a chunk to the target format: downsample and fold to mono
fn normalize_chunk(chunk: AudioChunk, target_sample_rate: u32, target_channels: u16) -> AudioChunk {
    let mut processed = chunk;

    if processed.sample_rate != target_sample_rate {
        processed = downsample_chunk(processed, target_sample_rate);
    }

    if processed.channels != target_channels && target_channels == 1 {
        processed = stereo_to_mono(processed);
    }

    processed
}

/// Downsample by decimation
fn downsample_chunk(chunk: AudioChunk, target_rate: u32) -> AudioChunk {
    if chunk.sample_rate == target_rate {
        return chunk;
    }

    let ratio = chunk.sample_rate / target_rate;
    if ratio <= 1 {
        return chunk; // Can't upsample
    }

    let downsampled: Vec<i16> = chunk
        .samples
        .iter()
        .step_by(ratio as usize)
        .copied()
        .collect();

    AudioChunk {
        samples: downsampled,
        sample_rate: target_rate,
        channels: chunk.channels,
        timestamp_ms: chunk.timestamp_ms,
    }
}

/// Convert stereo to mono by summing channels
fn stereo_to_mono(chunk: AudioChunk) -> AudioChunk {
    if chunk.channels == 1 {
        return chunk;
    }

    if chunk.channels != 2 {
        return chunk; // Only support stereo -> mono
    }

    let mut mono_samples = Vec::with_capacity(chunk.samples.len() / 2);

    // Sum left and right channels (no division to preserve volume)
    for pair in chunk.samples.chunks_exact(2) {
        let left = pair[0] as i32;
        let right = pair[1] as i32;
        let sum = left + right;
        let mono = sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        mono_samples.push(mono);
    }

    AudioChunk {
        samples: mono_samples,
        sample_rate: chunk.sample_rate,
        channels: 1,
        timestamp_ms: chunk.timestamp_ms,
    }
}

/// Encode PCM samples as an in-memory WAV blob
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV data")?;
    }

    Ok(cursor.into_inner())
}
