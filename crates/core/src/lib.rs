//! Lingokit Core Library
//!
//! Core functionality for turning a video or audio file into a bilingual
//! study kit — time-coded subtitles, notes, and flashcards — via the Gemini
//! API, plus per-line speech dubbing and subtitle/audio export.

pub mod client;
pub mod dub;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod speech;
pub mod types;

// Re-export commonly used items at crate root
pub use client::{GeminiClient, SpeechSynthesizer};
pub use dub::{DUB_SAMPLE_RATE, render_dub_track, write_wav};
pub use error::{LingokitError, Result};
pub use format::{SrtMode, format_srt, mux_command, normalize_srt_timestamp, timestamp_seconds};
pub use pipeline::{
    export_dub_audio, export_source_media, export_srt, load_study_kit, save_study_kit,
};
pub use provider::ProviderConfig;
pub use speech::{SpeechHandle, speak};
pub use types::{Flashcard, KitOptions, Note, StudyKit, Subtitle};
