//! Subprocess construction for ffmpeg, ffprobe and lookup tools.
//!
//! Every child the engine starts goes through these builders so it gets the
//! same baseline: no console window on Windows, no inherited stdin, and for
//! async children, termination when the handle is dropped.

use std::ffi::OsStr;
use std::process::Stdio;

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Blocking command for short-lived tools (`-version`, `which`)
pub fn tool_command(program: impl AsRef<OsStr>) -> std::process::Command {
    let mut cmd = std::process::Command::new(program);
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd.stdin(Stdio::null());
    cmd
}

/// Async command for transcodes and probes.
///
/// The child is killed if its future or handle is dropped, so a cancelled
/// clip never leaves an encoder running. Callers that stream frames override
/// stdin with a pipe.
pub fn media_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new(program);
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    cmd.stdin(Stdio::null()).kill_on_drop(true);
    cmd
}
