//! Narrow persistence collaborator
//!
//! The surrounding application owns the consultation records; this core
//! only ever asks it to save a transcript or a generated note.
//! Fire-and-confirm: no transactions span the two calls.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::notes::StructuredNote;

#[async_trait]
pub trait ConsultationStore: Send + Sync {
    async fn save_transcript(&self, consultation_id: &str, text: &str) -> anyhow::Result<()>;
    async fn save_notes(&self, consultation_id: &str, note: &StructuredNote)
        -> anyhow::Result<()>;
    async fn transcript(&self, consultation_id: &str) -> Option<String>;
    async fn notes(&self, consultation_id: &str) -> Option<StructuredNote>;
}

/// In-memory store backing the HTTP layer and tests
#[derive(Default)]
pub struct MemoryStore {
    transcripts: Mutex<HashMap<String, String>>,
    notes: Mutex<HashMap<String, StructuredNote>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConsultationStore for MemoryStore {
    async fn save_transcript(&self, consultation_id: &str, text: &str) -> anyhow::Result<()> {
        let mut transcripts = self.transcripts.lock().await;
        transcripts.insert(consultation_id.to_string(), text.to_string());
        info!("Transcript saved for consultation {}", consultation_id);
        Ok(())
    }

    async fn save_notes(
        &self,
        consultation_id: &str,
        note: &StructuredNote,
    ) -> anyhow::Result<()> {
        let mut notes = self.notes.lock().await;
        notes.insert(consultation_id.to_string(), note.clone());
        info!("Notes saved for consultation {}", consultation_id);
        Ok(())
    }

    async fn transcript(&self, consultation_id: &str) -> Option<String> {
        self.transcripts.lock().await.get(consultation_id).cloned()
    }

    async fn notes(&self, consultation_id: &str) -> Option<StructuredNote> {
        self.notes.lock().await.get(consultation_id).cloned()
    }
}
