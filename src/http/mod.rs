//! HTTP API for external control (the consultation UI)
//!
//! This module provides a REST API for driving the recording and
//! transcription pipeline:
//! - POST /consultations/:id/record/start - Start recording a segment
//! - POST /consultations/:id/record/stop - Finalize the segment
//! - GET  /consultations/:id/segments - List recorded segments
//! - DELETE /consultations/:id/segments/:segment_id - Delete a segment
//! - POST /consultations/:id/reset - Drop all segments
//! - GET  /consultations/:id/status - Session statistics
//! - GET  /consultations/:id/preview - Live transcript preview
//! - POST /consultations/:id/transcribe - Authoritative transcript
//! - POST /consultations/:id/notes - Generate structured notes
//! - GET  /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
