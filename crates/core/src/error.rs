use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LingokitError {
    #[error("Missing API key: {env_var} environment variable is not set")]
    MissingApiKey { env_var: String },

    #[error("Invalid API key: the service rejected the configured credential")]
    InvalidApiKey,

    #[error("Cancelled")]
    Cancelled,

    #[error("Upload failed for {file_name}: {reason}")]
    UploadFailed { file_name: String, reason: String },

    #[error("Remote processing failed for {file_name}")]
    ProcessingFailed { file_name: String },

    #[error("The uploaded file was still processing after {attempts} status checks")]
    PollTimeout { attempts: u32 },

    #[error("API quota exceeded, try again later")]
    QuotaExceeded,

    #[error("The service is overloaded, try again later")]
    Overloaded,

    #[error("The request was blocked by the content policy: {reason}")]
    ContentBlocked { reason: String },

    #[error("The media is too long for a single request: the model's output limit was exceeded")]
    ContextExceeded,

    #[error("Generation failed: {reason}")]
    GenerationFailed { reason: String },

    #[error("Speech synthesis failed: {reason}")]
    SynthesisFailed { reason: String },

    #[error("Speech playback failed for {program}: {reason}")]
    PlaybackFailed { program: String, reason: String },

    #[error("Media file not found: {path}")]
    MediaNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Audio encoding failed: {0}")]
    WavError(#[from] hound::Error),
}

pub type Result<T> = std::result::Result<T, LingokitError>;
