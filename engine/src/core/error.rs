//! Shortreel Error Definitions
//!
//! Defines error types used throughout the project.

use thiserror::Error;

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Source has no video stream: {0}")]
    NoVideoStream(String),

    // =========================================================================
    // Media Errors
    // =========================================================================
    #[error("FFmpeg error: {0}")]
    FFmpeg(#[from] super::ffmpeg::FFmpegError),

    #[error("Caption error: {0}")]
    Caption(#[from] super::captions::CaptionError),

    // =========================================================================
    // Settings Errors
    // =========================================================================
    #[error("Failed to load settings: {0}")]
    SettingsLoadFailed(String),

    #[error("Failed to save settings: {0}")]
    SettingsSaveFailed(String),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
