//! FFmpeg Detection Module
//!
//! Locates and validates the `ffmpeg`/`ffprobe` pair used for cutting,
//! canvas encoding and compositing.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{FFmpegError, FFmpegResult};
use crate::core::process::tool_command;

/// Environment variable naming a directory that holds both binaries
pub const FFMPEG_DIR_ENV: &str = "SHORTREEL_FFMPEG_DIR";

/// Information about detected FFmpeg installation
#[derive(Debug, Clone)]
pub struct FFmpegInfo {
    /// Path to ffmpeg binary
    pub ffmpeg_path: PathBuf,
    /// Path to ffprobe binary
    pub ffprobe_path: PathBuf,
    /// FFmpeg version string
    pub version: String,
}

#[cfg(target_os = "windows")]
const FFMPEG_BINARY: &str = "ffmpeg.exe";
#[cfg(not(target_os = "windows"))]
const FFMPEG_BINARY: &str = "ffmpeg";

#[cfg(target_os = "windows")]
const FFPROBE_BINARY: &str = "ffprobe.exe";
#[cfg(not(target_os = "windows"))]
const FFPROBE_BINARY: &str = "ffprobe";

/// Detect FFmpeg in an explicit directory
pub fn detect_ffmpeg_in(dir: &Path) -> FFmpegResult<FFmpegInfo> {
    let ffmpeg_path = dir.join(FFMPEG_BINARY);
    let ffprobe_path = dir.join(FFPROBE_BINARY);

    if !ffmpeg_path.exists() || !ffprobe_path.exists() {
        return Err(FFmpegError::NotFound);
    }

    let version = get_ffmpeg_version(&ffmpeg_path)?;
    Ok(FFmpegInfo {
        ffmpeg_path,
        ffprobe_path,
        version,
    })
}

/// Detect FFmpeg from `SHORTREEL_FFMPEG_DIR`, common install locations, or
/// the system PATH, in that order.
pub fn detect_system_ffmpeg() -> FFmpegResult<FFmpegInfo> {
    if let Some(dir) = std::env::var_os(FFMPEG_DIR_ENV) {
        let dir = PathBuf::from(dir);
        debug!("Looking for FFmpeg in {} from {}", dir.display(), FFMPEG_DIR_ENV);
        return detect_ffmpeg_in(&dir);
    }

    let ffmpeg_path = find_binary("ffmpeg", FFMPEG_BINARY)?;
    let ffprobe_path = find_binary("ffprobe", FFPROBE_BINARY)?;
    let version = get_ffmpeg_version(&ffmpeg_path)?;

    Ok(FFmpegInfo {
        ffmpeg_path,
        ffprobe_path,
        version,
    })
}

/// Find a binary in common locations, then fall back to `which`/`where`
fn find_binary(command_name: &str, binary_name: &str) -> FFmpegResult<PathBuf> {
    for dir in get_common_ffmpeg_paths() {
        let candidate = dir.join(binary_name);
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    #[cfg(target_os = "windows")]
    let mut lookup = tool_command("where");
    #[cfg(not(target_os = "windows"))]
    let mut lookup = tool_command("which");

    let output = lookup
        .arg(command_name)
        .output()
        .map_err(|_| FFmpegError::NotFound)?;

    if output.status.success() {
        let path_str = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = path_str.lines().next() {
            let trimmed = first_line.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }
    }

    Err(FFmpegError::NotFound)
}

/// Get common FFmpeg installation paths for the current platform
fn get_common_ffmpeg_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "windows")]
    {
        paths.push(PathBuf::from(r"C:\ffmpeg\bin"));
        paths.push(PathBuf::from(r"C:\Program Files\ffmpeg\bin"));

        // Chocolatey installation
        if let Ok(programdata) = std::env::var("ProgramData") {
            paths.push(PathBuf::from(programdata).join("chocolatey").join("bin"));
        }

        // Scoop installation
        if let Ok(userprofile) = std::env::var("USERPROFILE") {
            paths.push(PathBuf::from(userprofile).join("scoop").join("shims"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        paths.push(PathBuf::from("/opt/homebrew/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/opt/local/bin")); // MacPorts
    }

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/bin"));
        paths.push(PathBuf::from("/usr/local/bin"));
        paths.push(PathBuf::from("/snap/bin"));
    }

    paths
}

/// Get FFmpeg version string
fn get_ffmpeg_version(ffmpeg_path: &Path) -> FFmpegResult<String> {
    let output = tool_command(ffmpeg_path)
        .arg("-version")
        .output()
        .map_err(FFmpegError::ProcessError)?;

    if !output.status.success() {
        return Err(FFmpegError::ExecutionFailed(
            "Failed to get FFmpeg version".to_string(),
        ));
    }

    parse_version_output(&String::from_utf8_lossy(&output.stdout))
}

/// Extracts the version from `ffmpeg -version` output
fn parse_version_output(output: &str) -> FFmpegResult<String> {
    let first_line = output
        .lines()
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| FFmpegError::ParseError("Could not parse FFmpeg version".to_string()))?;

    // "ffmpeg version X.X.X ..."
    if let Some(version_part) = first_line.strip_prefix("ffmpeg version ") {
        if let Some(version) = version_part.split_whitespace().next() {
            return Ok(version.to_string());
        }
    }

    Ok(first_line.to_string())
}

/// Validate that FFmpeg binaries are functional
pub fn validate_ffmpeg(info: &FFmpegInfo) -> FFmpegResult<()> {
    for (path, label) in [(&info.ffmpeg_path, "FFmpeg"), (&info.ffprobe_path, "FFprobe")] {
        let output = tool_command(path)
            .arg("-version")
            .output()
            .map_err(FFmpegError::ProcessError)?;

        if !output.status.success() {
            return Err(FFmpegError::ExecutionFailed(format!(
                "{} binary is not functional",
                label
            )));
        }
    }

    Ok(())
}
