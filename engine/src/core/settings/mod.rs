//! Settings Persistence System
//!
//! Provides persistent shortreel settings with:
//! - Atomic file writes (temp file + rename)
//! - Schema defaults for every section, so partial files load
//! - Normalization that clamps bad values instead of failing
//! - Migration support for schema changes
//!
//! Storage location: {config_dir}/shortreel/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::core::captions::OverlayStyle;
use crate::core::ffmpeg::RenderSettings;
use crate::core::{CoreError, CoreResult};

/// Settings schema version for migration support
pub const SETTINGS_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE: &str = "settings.json";

/// Directory under the platform config dir
pub const APP_DIR: &str = "shortreel";

/// Environment variable that overrides the configured AssemblyAI key
pub const API_KEY_ENV: &str = "ASSEMBLYAI_API_KEY";

/// Shortreel settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShortsSettings {
    /// Schema version for migrations
    #[serde(default = "default_version")]
    pub version: u32,

    /// Clip cutting and encoding
    #[serde(default)]
    pub segment: SegmentSettings,

    /// Caption rendering and keying
    #[serde(default)]
    pub overlay: OverlayStyle,

    /// Transcript source
    #[serde(default)]
    pub transcription: TranscriptionSettings,

    /// Caption pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

fn default_version() -> u32 {
    SETTINGS_VERSION
}

impl Default for ShortsSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            segment: SegmentSettings::default(),
            overlay: OverlayStyle::default(),
            transcription: TranscriptionSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }
}

impl ShortsSettings {
    /// Clamps every section into its valid range
    pub fn normalize(&mut self) {
        self.segment.normalize();
        self.overlay.normalize();
        self.transcription.normalize();
        self.pipeline.normalize();
    }
}

// =============================================================================
// Segment Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSettings {
    /// Output width after crop and scale
    #[serde(default = "default_target_width")]
    pub target_width: u32,
    /// Output height after crop and scale
    #[serde(default = "default_target_height")]
    pub target_height: u32,
    /// Frame rate used when the command line does not give one
    #[serde(default = "default_fps")]
    pub default_fps: f64,
    /// Mirror clips horizontally
    #[serde(default = "default_true")]
    pub mirror: bool,
    #[serde(default = "default_video_codec")]
    pub video_codec: String,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default = "default_crf")]
    pub crf: u8,
}

fn default_target_width() -> u32 {
    1080
}

fn default_target_height() -> u32 {
    1920
}

fn default_fps() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

fn default_video_codec() -> String {
    "libx264".to_string()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

fn default_preset() -> String {
    "medium".to_string()
}

fn default_crf() -> u8 {
    23
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            target_width: default_target_width(),
            target_height: default_target_height(),
            default_fps: default_fps(),
            mirror: default_true(),
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            preset: default_preset(),
            crf: default_crf(),
        }
    }
}

impl SegmentSettings {
    fn normalize(&mut self) {
        self.target_width = even_dimension(self.target_width);
        self.target_height = even_dimension(self.target_height);
        self.default_fps = clamp_f64(self.default_fps, 1.0, 240.0);
        self.crf = self.crf.min(51);

        self.video_codec = normalize_enum(
            &self.video_codec,
            &["libx264", "libx265"],
            default_video_codec(),
        );
        self.audio_codec = normalize_enum(
            &self.audio_codec,
            &["aac", "libopus", "libmp3lame"],
            default_audio_codec(),
        );
        self.preset = normalize_enum(
            &self.preset,
            &[
                "ultrafast",
                "superfast",
                "veryfast",
                "faster",
                "fast",
                "medium",
                "slow",
                "slower",
                "veryslow",
            ],
            default_preset(),
        );
        if self.audio_bitrate.trim().is_empty() {
            self.audio_bitrate = default_audio_bitrate();
        }
    }

    /// Encoder settings for clips cut at `fps`
    pub fn render_settings(&self, fps: f64) -> RenderSettings {
        RenderSettings {
            width: self.target_width,
            height: self.target_height,
            fps,
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            audio_bitrate: self.audio_bitrate.clone(),
            preset: self.preset.clone(),
            crf: self.crf,
        }
    }
}

/// yuv420p needs even dimensions
fn even_dimension(value: u32) -> u32 {
    value.clamp(2, 7680) & !1
}

// =============================================================================
// Transcription Settings
// =============================================================================

/// Which service produces clip transcripts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    #[default]
    AssemblyAi,
    Sidecar,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionSettings {
    #[serde(default)]
    pub provider: TranscriptionProvider,
    /// AssemblyAI key; `ASSEMBLYAI_API_KEY` takes precedence
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Maximum characters per SRT caption
    #[serde(default = "default_chars_per_caption")]
    pub chars_per_caption: u32,
    #[serde(default = "default_true")]
    pub language_detection: bool,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Upper bound on one clip's transcription
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.assemblyai.com".to_string()
}

fn default_chars_per_caption() -> u32 {
    32
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::default(),
            api_key: None,
            base_url: default_base_url(),
            chars_per_caption: default_chars_per_caption(),
            language_detection: default_true(),
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TranscriptionSettings {
    fn normalize(&mut self) {
        if self.base_url.trim().is_empty() {
            self.base_url = default_base_url();
        }
        if self
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.api_key = None;
        }
        self.chars_per_caption = self.chars_per_caption.clamp(8, 200);
        self.poll_interval_secs = self.poll_interval_secs.clamp(1, 60);
        self.timeout_secs = self.timeout_secs.clamp(10, 7200);
        self.request_timeout_secs = self.request_timeout_secs.clamp(5, 600);
    }

    /// The API key to use: the environment first, then the settings file
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key_with_env(std::env::var(API_KEY_ENV).ok())
    }

    fn api_key_with_env(&self, env_key: Option<String>) -> Option<String> {
        env_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|key| !key.trim().is_empty()))
    }
}

// =============================================================================
// Pipeline Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    /// Caption clips after cutting
    #[serde(default = "default_true")]
    pub captions_enabled: bool,
    /// Keep the transcript next to the captioned clip
    #[serde(default)]
    pub keep_transcript: bool,
    /// Frames rendered per parallel batch
    #[serde(default = "default_render_batch_size")]
    pub render_batch_size: usize,
}

fn default_render_batch_size() -> usize {
    48
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            captions_enabled: default_true(),
            keep_transcript: false,
            render_batch_size: default_render_batch_size(),
        }
    }
}

impl PipelineSettings {
    fn normalize(&mut self) {
        self.render_batch_size = self.render_batch_size.clamp(1, 240);
    }
}

fn clamp_f64(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

fn normalize_enum(value: &str, allowed: &[&str], fallback: String) -> String {
    if allowed.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        value.to_ascii_lowercase()
    } else {
        fallback
    }
}

// =============================================================================
// Settings Manager
// =============================================================================

/// Default settings file location, if the platform has a config directory
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Loads and saves [`ShortsSettings`] under an advisory file lock
pub struct SettingsManager {
    settings_path: PathBuf,
}

impl SettingsManager {
    /// Create a settings manager for `settings.json` inside `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            settings_path: config_dir.join(SETTINGS_FILE),
        }
    }

    /// Create a settings manager for an explicit settings file
    pub fn with_path(settings_path: PathBuf) -> Self {
        Self { settings_path }
    }

    /// Manager for the platform default location
    pub fn default_location() -> CoreResult<Self> {
        default_settings_path()
            .map(Self::with_path)
            .ok_or_else(|| CoreError::SettingsLoadFailed("No config directory available".to_string()))
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .settings_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| SETTINGS_FILE.to_string());
        name.push_str(".lock");
        self.settings_path.with_file_name(name)
    }

    fn with_lock<T>(&self, exclusive: bool, op: impl FnOnce() -> CoreResult<T>) -> CoreResult<T> {
        // Ensure parent directory exists so the lock file can be created.
        if let Some(parent) = self.settings_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())?;

        if exclusive {
            fs2::FileExt::lock_exclusive(&lock_file).map_err(|e| {
                CoreError::Internal(format!("Failed to lock settings file (exclusive): {}", e))
            })?;
        } else {
            fs2::FileExt::lock_shared(&lock_file).map_err(|e| {
                CoreError::Internal(format!("Failed to lock settings file (shared): {}", e))
            })?;
        }

        let result = op();

        if let Err(e) = fs2::FileExt::unlock(&lock_file) {
            warn!("Failed to unlock settings lock file: {}", e);
        }

        result
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Load settings, failing on unreadable or invalid files.
    ///
    /// A missing file yields defaults.
    pub fn try_load(&self) -> CoreResult<ShortsSettings> {
        self.with_lock(false, || {
            if !self.settings_path.exists() {
                info!("Settings file not found, using defaults");
                return Ok(ShortsSettings::default());
            }

            let content = fs::read_to_string(&self.settings_path).map_err(|e| {
                CoreError::SettingsLoadFailed(format!("Failed to read settings file: {}", e))
            })?;

            let mut settings = serde_json::from_str::<ShortsSettings>(&content).map_err(|e| {
                CoreError::SettingsLoadFailed(format!("Failed to parse settings file: {}", e))
            })?;

            // Run migrations if needed
            if settings.version < SETTINGS_VERSION {
                info!(
                    "Migrating settings from version {} to {}",
                    settings.version, SETTINGS_VERSION
                );
                settings = self.migrate(settings);
            }

            settings.normalize();
            Ok(settings)
        })
    }

    /// Load settings from disk, returning defaults on any failure
    pub fn load(&self) -> ShortsSettings {
        match self.try_load() {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                ShortsSettings::default()
            }
        }
    }

    /// Normalize and save settings atomically; returns what was written
    pub fn save(&self, settings: &ShortsSettings) -> CoreResult<ShortsSettings> {
        self.with_lock(true, || {
            let mut normalized = settings.clone();
            normalized.normalize();

            crate::core::fs::atomic_write_json_pretty(&self.settings_path, &normalized)
                .map_err(|e| CoreError::SettingsSaveFailed(e.to_string()))?;

            info!("Settings saved to {:?}", self.settings_path);
            Ok(normalized)
        })
    }

    /// Reset settings to defaults and delete the settings file
    pub fn reset(&self) -> CoreResult<ShortsSettings> {
        self.with_lock(true, || {
            if self.settings_path.exists() {
                fs::remove_file(&self.settings_path)?;
                info!("Settings file deleted");
            }
            Ok(ShortsSettings::default())
        })
    }

    /// Migrate settings from older version
    fn migrate(&self, mut settings: ShortsSettings) -> ShortsSettings {
        settings.version = SETTINGS_VERSION;
        settings
    }
}
