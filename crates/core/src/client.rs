//! Gemini-backed request orchestrator.
//!
//! One structured-generation call produces the whole study kit; one speech
//! call per subtitle line produces dub audio. Small files are base64-inlined
//! into the generation request, larger files are uploaded out-of-band and the
//! remote processing state is polled until the file becomes active.
//!
//! Every suspension point (file read, upload, poll wait, generation call)
//! observes the shared [`CancellationToken`]; once it fires, pending work
//! rejects with [`LingokitError::Cancelled`] and no partial kit is returned.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LingokitError, Result},
    prompt::{build_instruction, response_schema},
    provider::ProviderConfig,
    types::{KitOptions, RawKit, StudyKit},
};

const MAX_OUTPUT_TOKENS: u32 = 65_536;
const GENERATION_TEMPERATURE: f32 = 0.3;

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
    FileData { file_data: FileData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct FileData {
    file_uri: String,
}

#[derive(Debug, Default, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<ResponseInlineData>,
}

#[derive(Debug, Deserialize)]
struct ResponseInlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

/// Remote readiness state of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: RemoteFile,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    name: String,
    uri: String,
    state: FileState,
}

#[derive(Debug, Deserialize)]
struct FileMeta {
    state: FileState,
}

// ---------------------------------------------------------------------------
// Cancellation & polling helpers
// ---------------------------------------------------------------------------

/// Race a fallible operation against the cancellation token.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(LingokitError::Cancelled),
        res = fut => res,
    }
}

/// Poll `fetch_state` at a fixed interval until the remote file is active.
///
/// Reports coarse percentage progress on every poll, fails with
/// [`LingokitError::PollTimeout`] after exactly `max_attempts` state fetches,
/// and exits with [`LingokitError::Cancelled`] as soon as the token fires,
/// even mid-sleep.
pub(crate) async fn poll_until_active<F, Fut>(
    mut fetch_state: F,
    file_name: &str,
    interval: Duration,
    max_attempts: u32,
    cancel: &CancellationToken,
    progress: impl Fn(u8),
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<FileState>>,
{
    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(LingokitError::Cancelled);
        }

        match with_cancel(cancel, fetch_state()).await? {
            FileState::Active => {
                progress(100);
                return Ok(());
            }
            FileState::Failed => {
                return Err(LingokitError::ProcessingFailed {
                    file_name: file_name.to_string(),
                });
            }
            FileState::Processing | FileState::Unknown => {
                let pct = (attempt as u64 * 100 / max_attempts as u64).min(99) as u8;
                progress(pct);
            }
        }

        // No point sleeping after the final fetch; time out immediately.
        if attempt < max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(LingokitError::Cancelled),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    Err(LingokitError::PollTimeout {
        attempts: max_attempts,
    })
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Map a non-success HTTP response onto the user-facing failure taxonomy.
/// Nothing here is retried automatically.
fn classify_http_error(status: StatusCode, body: &str) -> LingokitError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => LingokitError::QuotaExceeded,
        StatusCode::SERVICE_UNAVAILABLE => LingokitError::Overloaded,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LingokitError::InvalidApiKey,
        StatusCode::BAD_REQUEST if body.contains("API key not valid") => {
            LingokitError::InvalidApiKey
        }
        _ => LingokitError::GenerationFailed {
            reason: format!("HTTP {}: {}", status.as_u16(), body.trim()),
        },
    }
}

/// Pull the single text payload out of a generation response, surfacing
/// content blocks and output-budget exhaustion as distinct errors.
fn extract_text(response: GenerateResponse) -> Result<String> {
    if let Some(feedback) = response.prompt_feedback {
        if let Some(reason) = feedback.block_reason {
            return Err(LingokitError::ContentBlocked { reason });
        }
    }

    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| LingokitError::GenerationFailed {
            reason: "response contained no candidates".to_string(),
        })?;

    match candidate.finish_reason.as_deref() {
        // A truncated transcript would silently violate the gap-free
        // contract, so output exhaustion is a hard failure.
        Some("MAX_TOKENS") => return Err(LingokitError::ContextExceeded),
        Some(reason @ ("SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST")) => {
            return Err(LingokitError::ContentBlocked {
                reason: reason.to_string(),
            });
        }
        _ => {}
    }

    candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .filter(|text| !text.is_empty())
        .ok_or_else(|| LingokitError::GenerationFailed {
            reason: "response contained no text".to_string(),
        })
}

/// Decode a little-endian 16-bit PCM payload into normalized f32 samples.
fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

/// Guess the request MIME type from the file extension.
fn guess_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer
// ---------------------------------------------------------------------------

/// Per-line speech synthesis seam used by the dub renderer.
///
/// Implementors must be `Send + Sync` so the renderer can take
/// `&dyn SpeechSynthesizer`.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one line of speech as mono f32 samples at
    /// [`crate::dub::DUB_SAMPLE_RATE`].
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

pub struct GeminiClient {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl GeminiClient {
    /// Build a client from an explicit config. An empty credential is rejected
    /// here, before any work starts.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(LingokitError::MissingApiKey {
                env_var: crate::provider::API_KEY_ENV_VAR.to_string(),
            });
        }
        Ok(Self {
            http: reqwest::Client::new(),
            config,
        })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Generate the full study kit for one media file.
    ///
    /// `progress` receives coarse upload/processing percentages; inline-path
    /// runs jump straight to 100 before the generation call. Either the whole
    /// kit is produced or the call fails.
    pub async fn generate_study_kit(
        &self,
        media_path: &Path,
        opts: &KitOptions,
        cancel: &CancellationToken,
        progress: impl Fn(u8),
    ) -> Result<StudyKit> {
        if cancel.is_cancelled() {
            return Err(LingokitError::Cancelled);
        }
        if !media_path.exists() {
            return Err(LingokitError::MediaNotFound {
                path: media_path.to_path_buf(),
            });
        }

        let mime = guess_mime_type(media_path);
        let bytes = with_cancel(cancel, async {
            Ok(tokio::fs::read(media_path).await?)
        })
        .await?;

        let media_part = if bytes.len() as u64 <= self.config.inline_limit_bytes {
            progress(100);
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: mime.to_string(),
                    data: general_purpose::STANDARD.encode(&bytes),
                },
            }
        } else {
            let file_name = media_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "media".to_string());
            let remote = self.upload_media(bytes, mime, &file_name, cancel).await?;

            if remote.state == FileState::Active {
                progress(100);
            } else {
                let name = remote.name.clone();
                poll_until_active(
                    || self.fetch_file_state(&name),
                    &file_name,
                    self.config.poll_interval,
                    self.config.max_poll_attempts,
                    cancel,
                    &progress,
                )
                .await?;
            }

            Part::FileData {
                file_data: FileData {
                    file_uri: remote.uri,
                },
            }
        };

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: build_instruction(opts),
                    },
                    media_part,
                ],
            }],
            generation_config: GenerationConfig {
                temperature: Some(GENERATION_TEMPERATURE),
                max_output_tokens: Some(MAX_OUTPUT_TOKENS),
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(response_schema(opts)),
                ..GenerationConfig::default()
            },
        };

        let response = self
            .post_generate(&self.config.model, &request, cancel)
            .await?;
        let text = extract_text(response)?;
        let raw: RawKit = serde_json::from_str(&text)?;
        Ok(StudyKit::from(raw))
    }

    /// Upload the media out-of-band via the raw upload protocol.
    async fn upload_media(
        &self,
        bytes: Vec<u8>,
        mime: &str,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<RemoteFile> {
        let url = format!("{}/upload/v1beta/files", self.config.base_url);
        let request = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime)
            .body(bytes);

        let response = with_cancel(cancel, async { Ok(request.send().await?) }).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match classify_http_error(status, &body) {
                e @ (LingokitError::InvalidApiKey
                | LingokitError::QuotaExceeded
                | LingokitError::Overloaded) => e,
                _ => LingokitError::UploadFailed {
                    file_name: file_name.to_string(),
                    reason: format!("HTTP {}: {}", status.as_u16(), body.trim()),
                },
            });
        }

        let upload: UploadResponse = response.json().await?;
        Ok(upload.file)
    }

    async fn fetch_file_state(&self, remote_name: &str) -> Result<FileState> {
        let url = format!("{}/v1beta/{}", self.config.base_url, remote_name);
        let response = self
            .http
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        let meta: FileMeta = response.json().await?;
        Ok(meta.state)
    }

    async fn post_generate(
        &self,
        model: &str,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, model
        );
        let call = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(request);

        let response = with_cancel(cancel, async { Ok(call.send().await?) }).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_http_error(status, &body));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<f32>> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.config.tts_voice.clone(),
                        },
                    },
                }),
                ..GenerationConfig::default()
            },
        };

        // The dub renderer races this whole call against its caller's token;
        // the local token exists only to satisfy post_generate's signature.
        let cancel = CancellationToken::new();
        let response = self
            .post_generate(&self.config.tts_model, &request, &cancel)
            .await?;

        let encoded = response
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.inline_data))
            .map(|d| d.data)
            .ok_or_else(|| LingokitError::SynthesisFailed {
                reason: "response contained no audio".to_string(),
            })?;

        let pcm = general_purpose::STANDARD.decode(encoded).map_err(|e| {
            LingokitError::SynthesisFailed {
                reason: format!("invalid audio payload: {e}"),
            }
        })?;

        Ok(decode_pcm16(&pcm))
    }
}
