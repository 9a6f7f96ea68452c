use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a consultation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub consultation_id: String,

    /// Whether a segment is currently being recorded
    pub is_recording: bool,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Seconds on the session's running clock
    pub elapsed_secs: f64,

    /// Number of finalized segments in the store
    pub segment_count: usize,

    /// Total recorded duration across all segments
    pub combined_duration_secs: f64,

    /// Active transcription strategy ("unselected", "streaming", "batch")
    pub strategy: String,

    /// One-time downgrade notice, present once the session went offline
    pub offline_notice: Option<String>,
}
