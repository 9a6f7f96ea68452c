use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::notes::NoteGenerationClient;
use crate::persist::ConsultationStore;
use crate::session::ConsultationSession;
use crate::transcribe::BatchTranscribe;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active consultation sessions (consultation_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<ConsultationSession>>>>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Batch transcription channel shared across sessions
    pub batch: Arc<dyn BatchTranscribe>,

    /// Persistence collaborator
    pub persist: Arc<dyn ConsultationStore>,

    /// Note-generation client
    pub notes: Arc<NoteGenerationClient>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        batch: Arc<dyn BatchTranscribe>,
        persist: Arc<dyn ConsultationStore>,
        notes: Arc<NoteGenerationClient>,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
            batch,
            persist,
            notes,
        }
    }
}
