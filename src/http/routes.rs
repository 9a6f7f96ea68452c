use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Recording control
        .route(
            "/consultations/:id/record/start",
            post(handlers::start_recording),
        )
        .route(
            "/consultations/:id/record/stop",
            post(handlers::stop_recording),
        )
        // Segment management
        .route("/consultations/:id/segments", get(handlers::list_segments))
        .route(
            "/consultations/:id/segments/:segment_id/audio",
            get(handlers::get_segment_audio),
        )
        .route(
            "/consultations/:id/segments/:segment_id",
            delete(handlers::delete_segment),
        )
        .route("/consultations/:id/reset", post(handlers::reset_session))
        // Session queries
        .route("/consultations/:id/status", get(handlers::get_status))
        .route("/consultations/:id/preview", get(handlers::get_preview))
        // Transcription and notes
        .route(
            "/consultations/:id/transcribe",
            post(handlers::run_transcription),
        )
        .route("/consultations/:id/notes", post(handlers::generate_notes))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
