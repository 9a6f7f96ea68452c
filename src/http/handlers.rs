use super::state::AppState;
use crate::audio::{CaptureSource, DeviceError, DeviceFactory, RecordError};
use crate::notes::{NoteError, StructuredNote};
use crate::session::{ConsultationConfig, ConsultationSession, SessionError, SessionStats};
use crate::transcribe::{AttemptStatus, TranscribeError};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct StartRecordingRequest {
    /// Optional WAV file to replay instead of the physical microphone
    /// (testing / re-processing a consultation captured elsewhere)
    pub source_file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartRecordingResponse {
    pub consultation_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponse {
    pub consultation_id: String,
    pub segment: crate::audio::SegmentSummary,
}

#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub segment_id: Uuid,
    pub succeeded: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub consultation_id: String,
    pub text: String,
    pub attempts: Vec<AttemptView>,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub consultation_id: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct NotesResponse {
    pub consultation_id: String,
    pub note: StructuredNote,
}

#[derive(Debug, Serialize)]
pub struct DeleteSegmentResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Map a session error to the status code its remediation calls for
fn session_error(e: &SessionError) -> axum::response::Response {
    let status = match e {
        SessionError::Record(RecordError::NoAudioCaptured)
        | SessionError::Record(RecordError::AudioTooSmall { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::Record(RecordError::NotRecording) => StatusCode::CONFLICT,
        SessionError::Record(RecordError::Device(DeviceError::PermissionDenied(_))) => {
            StatusCode::FORBIDDEN
        }
        SessionError::Record(RecordError::Device(DeviceError::DeviceNotFound(_)))
        | SessionError::Record(RecordError::Device(DeviceError::DeviceBusy(_))) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::Transcribe(TranscribeError::NoValidTranscription) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::Transcribe(_) => StatusCode::BAD_GATEWAY,
        SessionError::Note(NoteError::EmptyTranscript) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::Note(_) => StatusCode::BAD_GATEWAY,
        SessionError::ResetDuringTranscription => StatusCode::CONFLICT,
        SessionError::MissingTranscript => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e.to_string())
}

async fn find_session(
    state: &AppState,
    consultation_id: &str,
) -> Option<Arc<ConsultationSession>> {
    let sessions = state.sessions.read().await;
    sessions.get(consultation_id).cloned()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /consultations/:id/record/start
/// Start recording a new segment (creates the session on first use)
pub async fn start_recording(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
    req: Option<Json<StartRecordingRequest>>,
) -> impl IntoResponse {
    let req = req.map(|Json(r)| r).unwrap_or_default();

    info!("Starting recording for consultation: {}", consultation_id);

    let session = match find_session(&state, &consultation_id).await {
        Some(session) => session,
        None => {
            let source = match &req.source_file {
                Some(path) => CaptureSource::File(path.clone()),
                None => CaptureSource::Microphone,
            };

            let device = match DeviceFactory::create(source) {
                Ok(device) => device,
                Err(e) => {
                    error!("Failed to create capture device: {}", e);
                    return session_error(&SessionError::Record(RecordError::Device(e)));
                }
            };

            let session = ConsultationSession::new(
                ConsultationConfig::for_consultation(&state.config, consultation_id.clone()),
                device,
                Arc::clone(&state.batch),
                state.config.transcription.stream.clone(),
                Arc::clone(&state.persist),
                Arc::clone(&state.notes),
            );

            let mut sessions = state.sessions.write().await;
            sessions.insert(consultation_id.clone(), Arc::clone(&session));
            session
        }
    };

    if let Err(e) = session.start_recording().await {
        error!("Failed to start recording: {}", e);
        return session_error(&e);
    }

    (
        StatusCode::OK,
        Json(StartRecordingResponse {
            consultation_id,
            status: "recording".to_string(),
        }),
    )
        .into_response()
}

/// POST /consultations/:id/record/stop
/// Stop recording and finalize the segment
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_session(&state, &consultation_id).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        );
    };

    match session.stop_recording().await {
        Ok(segment) => (
            StatusCode::OK,
            Json(StopRecordingResponse {
                consultation_id,
                segment,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            session_error(&e)
        }
    }
}

/// GET /consultations/:id/segments
pub async fn list_segments(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &consultation_id).await {
        Some(session) => (StatusCode::OK, Json(session.segments().await)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        ),
    }
}

/// GET /consultations/:id/segments/:segment_id/audio
/// Raw segment audio for playback
pub async fn get_segment_audio(
    State(state): State<AppState>,
    Path((consultation_id, segment_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    let Some(session) = find_session(&state, &consultation_id).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        );
    };

    match session.segment_audio(segment_id).await {
        Some((media_type, bytes)) => {
            ([(header::CONTENT_TYPE, media_type)], bytes).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Segment {} not found", segment_id),
        ),
    }
}

/// DELETE /consultations/:id/segments/:segment_id
/// Idempotent: deleting an unknown segment reports deleted=false
pub async fn delete_segment(
    State(state): State<AppState>,
    Path((consultation_id, segment_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    match find_session(&state, &consultation_id).await {
        Some(session) => {
            let deleted = session.delete_segment(segment_id).await;
            (StatusCode::OK, Json(DeleteSegmentResponse { deleted })).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        ),
    }
}

/// POST /consultations/:id/reset
/// Drop all recorded segments and their playback files
pub async fn reset_session(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &consultation_id).await {
        Some(session) => {
            session.reset().await;
            StatusCode::NO_CONTENT.into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        ),
    }
}

/// GET /consultations/:id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &consultation_id).await {
        Some(session) => {
            let stats: SessionStats = session.stats().await;
            (StatusCode::OK, Json(stats)).into_response()
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        ),
    }
}

/// GET /consultations/:id/preview
/// Best-effort live transcript accumulated from the streaming channel
pub async fn get_preview(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> impl IntoResponse {
    match find_session(&state, &consultation_id).await {
        Some(session) => (
            StatusCode::OK,
            Json(PreviewResponse {
                consultation_id,
                text: session.live_preview().await,
            }),
        )
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        ),
    }
}

/// POST /consultations/:id/transcribe
/// Authoritative combined transcript from the ordered segment list
pub async fn run_transcription(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_session(&state, &consultation_id).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        );
    };

    match session.transcribe_and_save().await {
        Ok(combined) => {
            let attempts = combined
                .attempts
                .iter()
                .map(|a| AttemptView {
                    segment_id: a.segment_id,
                    succeeded: a.status == AttemptStatus::Succeeded,
                    error: a.error.clone(),
                })
                .collect();

            (
                StatusCode::OK,
                Json(TranscriptResponse {
                    consultation_id,
                    text: combined.text,
                    attempts,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Transcription failed: {}", e);
            session_error(&e)
        }
    }
}

/// POST /consultations/:id/notes
/// Generate structured notes from the saved transcript
pub async fn generate_notes(
    State(state): State<AppState>,
    Path(consultation_id): Path<String>,
) -> impl IntoResponse {
    let Some(session) = find_session(&state, &consultation_id).await else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("Consultation {} not found", consultation_id),
        );
    };

    match session.generate_notes().await {
        Ok(note) => (
            StatusCode::OK,
            Json(NotesResponse {
                consultation_id,
                note,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Note generation failed: {}", e);
            session_error(&e)
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
