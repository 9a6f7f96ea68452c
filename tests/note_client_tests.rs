// Tests for the note-generation client
//
// A counting stub stands in for the AI backend so the empty-transcript
// precondition can be verified to short-circuit before any call.

use async_trait::async_trait;
use consult_scribe::notes::{NoteBackend, NoteError, NoteGenerationClient, StructuredNote};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

struct StubBackend {
    calls: AtomicUsize,
    last_transcript: Mutex<Option<String>>,
    fail_with: Option<String>,
}

impl StubBackend {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_transcript: Mutex::new(None),
            fail_with: None,
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_transcript: Mutex::new(None),
            fail_with: Some(message.to_string()),
        })
    }
}

#[async_trait]
impl NoteBackend for StubBackend {
    async fn request(&self, transcript: &str) -> Result<StructuredNote, NoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_transcript.lock().await = Some(transcript.to_string());

        if let Some(message) = &self.fail_with {
            return Err(NoteError::NoteGenerationFailed(message.clone()));
        }

        Ok(StructuredNote {
            chief_complaint: "headache".to_string(),
            history: "three days of frontal headache".to_string(),
            assessment: "tension-type headache".to_string(),
            plan: "analgesia, hydration, follow up in one week".to_string(),
        })
    }
}

#[tokio::test]
async fn test_empty_transcript_fails_without_backend_call() {
    // Scenario D: the precondition short-circuits before the network
    let backend = StubBackend::succeeding();
    let client = NoteGenerationClient::new(backend.clone());

    let result = client.generate("").await;

    assert!(matches!(result, Err(NoteError::EmptyTranscript)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0, "No backend call may happen");
}

#[tokio::test]
async fn test_whitespace_transcript_counts_as_empty() {
    let backend = StubBackend::succeeding();
    let client = NoteGenerationClient::new(backend.clone());

    let result = client.generate("  \n\t ").await;

    assert!(matches!(result, Err(NoteError::EmptyTranscript)));
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_transcript_is_trimmed_before_sending() {
    let backend = StubBackend::succeeding();
    let client = NoteGenerationClient::new(backend.clone());

    let note = client
        .generate("  patient reports headache\n")
        .await
        .expect("generation should succeed");

    assert_eq!(note.chief_complaint, "headache");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.last_transcript.lock().await.as_deref(),
        Some("patient reports headache")
    );
}

#[tokio::test]
async fn test_backend_failure_surfaces_with_message() {
    let backend = StubBackend::failing("upstream returned 503");
    let client = NoteGenerationClient::new(backend.clone());

    let result = client.generate("patient reports headache").await;

    match result {
        Err(NoteError::NoteGenerationFailed(message)) => {
            assert!(message.contains("503"));
        }
        other => panic!("Expected NoteGenerationFailed, got {:?}", other),
    }

    // Exactly one attempt; the client never retries on its own
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}
