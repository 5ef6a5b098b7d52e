//! AssemblyAI Transcription Provider
//!
//! Upload → create transcript (language detection on) → poll until
//! completed → download the SRT export with a caption width limit.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Transcriber, TranscriptionError, TranscriptionResult};
use crate::core::settings::TranscriptionSettings;

// =============================================================================
// Configuration
// =============================================================================

/// Connection and request parameters for AssemblyAI
#[derive(Debug, Clone)]
pub struct AssemblyAiConfig {
    pub api_key: String,
    pub base_url: String,
    /// Maximum characters per SRT caption
    pub chars_per_caption: u32,
    pub language_detection: bool,
    pub poll_interval: Duration,
    /// Upper bound on the whole transcribe call
    pub timeout: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl AssemblyAiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.assemblyai.com";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            chars_per_caption: 32,
            language_detection: true,
            poll_interval: Duration::from_secs(3),
            timeout: Duration::from_secs(600),
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn from_settings(settings: &TranscriptionSettings, api_key: String) -> Self {
        Self {
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            chars_per_caption: settings.chars_per_caption,
            language_detection: settings.language_detection,
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            timeout: Duration::from_secs(settings.timeout_secs),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

// =============================================================================
// API Types
// =============================================================================

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
    language_detection: bool,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: TranscriptStatus,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: String,
}

// =============================================================================
// Transcriber
// =============================================================================

/// AssemblyAI-backed [`Transcriber`]
pub struct AssemblyAiTranscriber {
    config: AssemblyAiConfig,
    client: reqwest::Client,
}

impl AssemblyAiTranscriber {
    pub fn new(config: AssemblyAiConfig) -> TranscriptionResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(TranscriptionError::ApiKeyMissing);
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                TranscriptionError::RequestFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn upload(&self, media: &Path) -> TranscriptionResult<String> {
        let bytes = tokio::fs::read(media).await?;
        debug!("Uploading {} ({} bytes)", media.display(), bytes.len());

        let response = self
            .client
            .post(self.url("/v2/upload"))
            .header("authorization", &self.config.api_key)
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(request_failed)?;

        let body = read_success_body(response).await?;
        let upload: UploadResponse = parse_json(&body)?;
        Ok(upload.upload_url)
    }

    async fn create_transcript(&self, audio_url: &str) -> TranscriptionResult<TranscriptResponse> {
        let request = TranscriptRequest {
            audio_url,
            language_detection: self.config.language_detection,
        };

        let response = self
            .client
            .post(self.url("/v2/transcript"))
            .header("authorization", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(request_failed)?;

        let body = read_success_body(response).await?;
        parse_json(&body)
    }

    async fn fetch_transcript(&self, id: &str) -> TranscriptionResult<TranscriptResponse> {
        let response = self
            .client
            .get(self.url(&format!("/v2/transcript/{}", id)))
            .header("authorization", &self.config.api_key)
            .send()
            .await
            .map_err(request_failed)?;

        let body = read_success_body(response).await?;
        parse_json(&body)
    }

    /// Polls until the transcript leaves the queued/processing states
    async fn wait_for_completion(&self, mut transcript: TranscriptResponse) -> TranscriptionResult<String> {
        let deadline = tokio::time::Instant::now() + self.config.timeout;

        loop {
            match transcript.status {
                TranscriptStatus::Completed => return Ok(transcript.id),
                TranscriptStatus::Error => {
                    return Err(TranscriptionError::TranscriptFailed {
                        id: transcript.id,
                        message: transcript.error.unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                TranscriptStatus::Queued | TranscriptStatus::Processing => {}
            }

            if tokio::time::Instant::now() + self.config.poll_interval > deadline {
                return Err(TranscriptionError::Timeout(self.config.timeout.as_secs()));
            }
            tokio::time::sleep(self.config.poll_interval).await;
            transcript = self.fetch_transcript(&transcript.id).await?;
        }
    }

    async fn download_srt(&self, id: &str) -> TranscriptionResult<String> {
        let response = self
            .client
            .get(self.url(&format!("/v2/transcript/{}/srt", id)))
            .query(&[("chars_per_caption", self.config.chars_per_caption)])
            .header("authorization", &self.config.api_key)
            .send()
            .await
            .map_err(request_failed)?;

        read_success_body(response).await
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    fn name(&self) -> &'static str {
        "assemblyai"
    }

    async fn transcribe(&self, media: &Path) -> TranscriptionResult<String> {
        info!("Transcribing {} with AssemblyAI", media.display());

        let audio_url = self.upload(media).await?;
        let created = self.create_transcript(&audio_url).await?;
        debug!("Transcript {} created", created.id);

        let id = self.wait_for_completion(created).await?;
        let srt = self.download_srt(&id).await?;

        if srt.trim().is_empty() {
            return Err(TranscriptionError::EmptyTranscript);
        }
        Ok(srt)
    }
}

fn request_failed(e: reqwest::Error) -> TranscriptionError {
    TranscriptionError::RequestFailed(format!("Request failed: {}", e))
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> TranscriptionResult<T> {
    serde_json::from_str(body)
        .map_err(|e| TranscriptionError::RequestFailed(format!("Failed to parse response: {}", e)))
}

/// Reads the body, turning non-2xx responses into `ServiceError`
async fn read_success_body(response: reqwest::Response) -> TranscriptionResult<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| TranscriptionError::RequestFailed(format!("Failed to read response: {}", e)))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        return Err(TranscriptionError::ServiceError {
            status: status.as_u16(),
            message,
        });
    }

    Ok(body)
}
