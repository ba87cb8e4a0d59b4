use std::time::Duration;

use crate::error::{LingokitError, Result};

pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_TTS_VOICE: &str = "Kore";

/// Files at or below this size are base64-inlined into the generation request;
/// larger files go through the out-of-band upload + poll path.
pub const DEFAULT_INLINE_LIMIT_BYTES: u64 = 20 * 1024 * 1024;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;

/// Explicit configuration for the Gemini-backed client. The credential is a
/// constructor argument rather than ambient state, so a missing key is a
/// constructable precondition instead of a deep runtime failure.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub inline_limit_bytes: u64,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            inline_limit_bytes: DEFAULT_INLINE_LIMIT_BYTES,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    /// Build a config from the `GEMINI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var(API_KEY_ENV_VAR).map_err(|_| LingokitError::MissingApiKey {
                env_var: API_KEY_ENV_VAR.to_string(),
            })?;
        if api_key.trim().is_empty() {
            return Err(LingokitError::MissingApiKey {
                env_var: API_KEY_ENV_VAR.to_string(),
            });
        }
        Ok(Self::new(api_key))
    }
}
