use std::path::PathBuf;

use crate::audio::CaptureConstraints;
use crate::config::Config;

/// Configuration for one consultation session
#[derive(Debug, Clone)]
pub struct ConsultationConfig {
    /// Unique consultation identifier
    pub consultation_id: String,

    /// Directory for this consultation's playback files
    pub recordings_dir: PathBuf,

    /// Capture format segments are normalized to
    pub constraints: CaptureConstraints,

    /// Minimum viable size of a finalized segment
    pub min_segment_bytes: usize,
}

impl ConsultationConfig {
    /// Derive a per-consultation config from the application config
    pub fn for_consultation(app: &Config, consultation_id: String) -> Self {
        Self {
            recordings_dir: PathBuf::from(&app.audio.recordings_path).join(&consultation_id),
            constraints: CaptureConstraints {
                sample_rate: app.audio.sample_rate,
                channels: app.audio.channels,
                buffer_duration_ms: 100,
            },
            min_segment_bytes: app.audio.min_segment_bytes,
            consultation_id,
        }
    }
}

impl Default for ConsultationConfig {
    fn default() -> Self {
        Self {
            consultation_id: format!("consult-{}", uuid::Uuid::new_v4()),
            recordings_dir: PathBuf::from("recordings"),
            constraints: CaptureConstraints::default(),
            min_segment_bytes: 1024,
        }
    }
}
