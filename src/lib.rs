pub mod audio;
pub mod config;
pub mod http;
pub mod notes;
pub mod persist;
pub mod session;
pub mod transcribe;

pub use audio::{
    AudioChunk, AudioSegment, CaptureConstraints, CaptureDevice, CaptureSource, DeviceError,
    DeviceFactory, FileDevice, RecordError, RecordState, SegmentRecorder, SegmentStore,
    SegmentSummary,
};
pub use config::Config;
pub use http::{create_router, AppState};
pub use notes::{NoteBackend, NoteError, NoteGenerationClient, StructuredNote};
pub use persist::{ConsultationStore, MemoryStore};
pub use session::{ConsultationConfig, ConsultationSession, SessionError, SessionStats};
pub use transcribe::{
    BatchTranscribe, ChannelEvent, ChannelState, CombinedTranscript, Strategy, StreamingChannel,
    TranscribeError, TranscriptionAttempt, TranscriptionOrchestrator,
};
