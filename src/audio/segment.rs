use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// One bounded, finalized unit of recorded audio
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Generated at segment-finalize time
    pub id: Uuid,
    /// Encoded audio payload; never empty once stored
    pub bytes: Vec<u8>,
    /// Declared container type of `bytes`
    pub media_type: String,
    /// Wall-clock length, from the session's running clock
    pub duration_seconds: f64,
    /// Creation timestamp; display/ordering tie-break only
    pub captured_at: DateTime<Utc>,
}

impl AudioSegment {
    pub fn summary(&self) -> SegmentSummary {
        SegmentSummary {
            id: self.id,
            media_type: self.media_type.clone(),
            duration_seconds: self.duration_seconds,
            size_bytes: self.bytes.len(),
            captured_at: self.captured_at,
        }
    }
}

/// Metadata view of a segment, safe to hand to the UI layer
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub id: Uuid,
    pub media_type: String,
    pub duration_seconds: f64,
    pub size_bytes: usize,
    pub captured_at: DateTime<Utc>,
}

/// Playback file written next to a stored segment
///
/// The file backs audio playback in the UI; it lives exactly as long as
/// the segment does. Removal happens inside the store call that drops
/// the segment, and again best-effort on drop if the store is torn down
/// without a reset.
#[derive(Debug)]
struct PlaybackFile {
    path: Option<PathBuf>,
}

impl PlaybackFile {
    fn write(dir: &Path, segment: &AudioSegment) -> Result<Self> {
        fs::create_dir_all(dir).context("Failed to create recordings directory")?;

        let path = dir.join(format!("{}.wav", segment.id));
        fs::write(&path, &segment.bytes)
            .with_context(|| format!("Failed to write playback file: {:?}", path))?;

        Ok(Self { path: Some(path) })
    }

    fn release(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove playback file {:?}: {}", path, e);
            }
        }
    }
}

impl Drop for PlaybackFile {
    fn drop(&mut self) {
        self.release();
    }
}

struct StoredSegment {
    segment: AudioSegment,
    playback: PlaybackFile,
}

/// Ordered in-memory collection of finalized segments
///
/// Insertion order is recording order; the orchestrator relies on it
/// when assembling the combined transcript.
pub struct SegmentStore {
    recordings_dir: PathBuf,
    segments: Vec<StoredSegment>,
    generation: u64,
}

impl SegmentStore {
    pub fn new(recordings_dir: impl Into<PathBuf>) -> Self {
        Self {
            recordings_dir: recordings_dir.into(),
            segments: Vec::new(),
            generation: 0,
        }
    }

    /// Bumped on every reset; a long-running call captures it before
    /// suspending and discards its result if the store moved on
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Append a finalized segment, preserving insertion order
    pub fn append(&mut self, segment: AudioSegment) -> Result<SegmentSummary> {
        let playback = PlaybackFile::write(&self.recordings_dir, &segment)?;
        let summary = segment.summary();

        info!(
            "Segment stored: {} ({:.1}s, {} bytes)",
            summary.id, summary.duration_seconds, summary.size_bytes
        );

        self.segments.push(StoredSegment { segment, playback });
        Ok(summary)
    }

    /// Remove a segment and release its playback file
    ///
    /// Returns whether a segment was removed. An unknown id is a no-op,
    /// not an error: fast UI interaction produces double-deletes.
    pub fn delete_by_id(&mut self, id: Uuid) -> bool {
        match self.segments.iter().position(|s| s.segment.id == id) {
            Some(index) => {
                let mut stored = self.segments.remove(index);
                stored.playback.release();
                info!("Segment deleted: {}", id);
                true
            }
            None => false,
        }
    }

    /// Release all playback files and empty the collection
    pub fn reset(&mut self) {
        for stored in &mut self.segments {
            stored.playback.release();
        }
        let dropped = self.segments.len();
        self.segments.clear();
        self.generation += 1;
        info!("Segment store reset ({} segments dropped)", dropped);
    }

    /// Ordered segments, oldest first
    pub fn all(&self) -> Vec<AudioSegment> {
        self.segments.iter().map(|s| s.segment.clone()).collect()
    }

    /// Metadata for every stored segment, in order
    pub fn summaries(&self) -> Vec<SegmentSummary> {
        self.segments.iter().map(|s| s.segment.summary()).collect()
    }

    /// Raw bytes of one segment, for playback
    pub fn bytes_of(&self, id: Uuid) -> Option<(String, Vec<u8>)> {
        self.segments
            .iter()
            .find(|s| s.segment.id == id)
            .map(|s| (s.segment.media_type.clone(), s.segment.bytes.clone()))
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total recorded duration across all segments
    pub fn combined_duration_seconds(&self) -> f64 {
        self.segments
            .iter()
            .map(|s| s.segment.duration_seconds)
            .sum()
    }
}
