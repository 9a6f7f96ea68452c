use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub notes: NotesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Directory where per-segment playback WAV files are written
    pub recordings_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Finalized segments smaller than this are rejected as too small
    pub min_segment_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    pub stream: StreamSettings,
    pub batch: BatchSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamSettings {
    /// NATS server URL for the real-time transcription backend
    pub nats_url: String,
    /// Seconds between liveness probes while the channel is open
    pub heartbeat_interval_secs: u64,
    /// Seconds to wait for a probe reply before treating it as a miss
    pub heartbeat_timeout_secs: u64,
    /// Degraded-state probes allowed before the channel closes for good
    pub max_reconnect_attempts: u32,
    /// Fixed delay between degraded-state probes
    pub reconnect_backoff_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchSettings {
    /// Endpoint receiving one upload-and-wait request per segment
    pub endpoint: String,
    /// Per-request timeout; an expired request is a failed attempt
    pub request_timeout_secs: u64,
    /// Bearer credential attached to outgoing requests, if set
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotesConfig {
    /// Note-generation endpoint, called once per combined transcript
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub bearer_token: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "consult-scribe".to_string(),
                http: HttpConfig {
                    bind: "127.0.0.1".to_string(),
                    port: 8470,
                },
            },
            audio: AudioConfig {
                recordings_path: "recordings".to_string(),
                sample_rate: 16000,
                channels: 1,
                min_segment_bytes: 1024,
            },
            transcription: TranscriptionConfig {
                stream: StreamSettings {
                    nats_url: "nats://localhost:4222".to_string(),
                    heartbeat_interval_secs: 15,
                    heartbeat_timeout_secs: 5,
                    max_reconnect_attempts: 3,
                    reconnect_backoff_secs: 2,
                },
                batch: BatchSettings {
                    endpoint: "http://localhost:8090/v1/transcribe".to_string(),
                    request_timeout_secs: 30,
                    bearer_token: None,
                },
            },
            notes: NotesConfig {
                endpoint: "http://localhost:8090/v1/notes".to_string(),
                request_timeout_secs: 60,
                bearer_token: None,
            },
        }
    }
}
