pub mod client;

pub use client::{HttpNoteBackend, NoteBackend, NoteError, NoteGenerationClient, StructuredNote};
