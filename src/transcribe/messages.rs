use serde::{Deserialize, Serialize};

/// Audio frame published to the streaming transcription backend
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioFrameMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM bytes
    pub sample_rate: u32,
    pub channels: u16,
    pub timestamp: String, // RFC3339 timestamp
    #[serde(rename = "final")]
    pub final_frame: bool,
}

/// Event received from the streaming transcription backend
///
/// The backend multiplexes transcript, status and error payloads on one
/// subject; the variant tag is decoded exactly once, here at the
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Transcript {
        text: String,
        is_final: bool,
    },
    Status {
        status: StreamStatus,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Connected,
    Disconnected,
}

/// One upload-and-wait request carrying a finalized segment
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub segment_id: String,
    pub audio: String, // Base64-encoded segment bytes
    pub media_type: String,
}

/// Successful batch transcription response
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub text: String,
}
