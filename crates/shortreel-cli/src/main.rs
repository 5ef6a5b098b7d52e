//! Shortreel CLI
//!
//! Cuts a long video into numbered vertical shorts and burns captions into
//! them. Settings come from `settings.json` in the platform config directory
//! unless `--config` points elsewhere.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use shortreel_lib::core::captions::{parse_cues, Cue, FrameRange};
use shortreel_lib::core::ffmpeg::{detect_system_ffmpeg, FFmpegRunner, MediaBackend};
use shortreel_lib::core::pipeline::CaptionPipeline;
use shortreel_lib::core::segment::{ClipStatus, SegmentDriver, SegmentPlan};
use shortreel_lib::core::settings::{SettingsManager, ShortsSettings};
use shortreel_lib::core::transcription::create_transcriber;
use shortreel_lib::init_logging;

#[derive(Parser, Debug)]
#[command(name = "shortreel", version, about = "Cut vertical shorts with burned-in captions")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write daily-rolling log files to this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cut a video into numbered shorts and caption each one
    Split {
        /// Source video
        video: PathBuf,
        /// Number of clips to cut
        #[arg(short, long, default_value_t = 1)]
        count: u32,
        /// Clip length in seconds
        #[arg(short, long, default_value_t = 60.0)]
        length: f64,
        /// Offset of part 1 into the source, in seconds
        #[arg(short, long, default_value_t = 0.0)]
        start: f64,
        /// Output frame rate (defaults to the configured rate)
        #[arg(long)]
        fps: Option<f64>,
        /// Parts already cut by an earlier run
        #[arg(short, long, default_value_t = 0)]
        existing: u32,
        /// Only cut, never caption
        #[arg(long)]
        no_captions: bool,
        /// Folder receiving `<video stem>/` (defaults to the source's folder)
        #[arg(short, long)]
        output_root: Option<PathBuf>,
    },

    /// Caption a single clip
    Caption {
        clip: PathBuf,
        /// Where to move the captioned clip
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the cues of a transcript with their frame ranges
    Cues {
        transcript: PathBuf,
        #[arg(long, default_value_t = 30.0)]
        fps: f64,
    },

    /// Print the effective settings
    Config {
        /// Write the defaults to the settings file first
        #[arg(long)]
        init: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CueListing<'a> {
    #[serde(flatten)]
    cue: &'a Cue,
    frames: FrameRange,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, cli.log_dir.as_deref());

    let settings_manager = match &cli.config {
        Some(path) => SettingsManager::with_path(path.clone()),
        None => SettingsManager::default_location()?,
    };

    match cli.command {
        Commands::Split {
            video,
            count,
            length,
            start,
            fps,
            existing,
            no_captions,
            output_root,
        } => {
            let settings = settings_manager.try_load()?;
            let backend = ffmpeg_backend()?;
            let fps = fps.unwrap_or(settings.segment.default_fps);

            let output_root = match output_root {
                Some(root) => root,
                None => video
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            };

            let mut driver =
                SegmentDriver::new(backend.clone(), settings.segment.clone(), output_root);
            if !no_captions {
                if let Some(pipeline) = caption_pipeline(&settings, backend, fps)? {
                    driver = driver.with_captions(pipeline);
                }
            }

            let plan = SegmentPlan {
                source: video,
                count,
                clip_length_sec: length,
                start_point_sec: start,
                fps,
                existing_parts: existing,
            };
            let report = driver.run(&plan).await?;

            for clip in &report.clips {
                match &clip.status {
                    ClipStatus::Captioned { captioned } => {
                        println!("part {}: {}", clip.window.part, captioned.display())
                    }
                    ClipStatus::Cut => println!("part {}: {}", clip.window.part, clip.clip.display()),
                    ClipStatus::Uncaptioned { reason } => println!(
                        "part {}: {} (no captions: {})",
                        clip.window.part,
                        clip.clip.display(),
                        reason
                    ),
                    ClipStatus::Failed { reason } => {
                        println!("part {}: failed: {}", clip.window.part, reason)
                    }
                }
            }
            info!(
                "{} of {} clips cut, {} captioned",
                report.cut_count(),
                report.clips.len(),
                report.captioned_count()
            );

            if report.failed_count() > 0 {
                bail!("{} clips failed to cut", report.failed_count());
            }
        }

        Commands::Caption { clip, output } => {
            let settings = settings_manager.try_load()?;
            let backend = ffmpeg_backend()?;
            let fps = settings.segment.default_fps;
            let pipeline = caption_pipeline(&settings, backend, fps)?
                .ok_or_else(|| anyhow!("Transcription is disabled in settings"))?;

            let outcome = pipeline.run(&clip).await?;
            let written = match output {
                Some(target) => {
                    move_file(&outcome.output, &target)
                        .await
                        .with_context(|| format!("Failed to move output to {}", target.display()))?;
                    target
                }
                None => outcome.output,
            };
            println!("{}", written.display());
        }

        Commands::Cues { transcript, fps } => {
            if !fps.is_finite() || fps <= 0.0 {
                bail!("Frame rate must be positive, got {}", fps);
            }
            let content = std::fs::read_to_string(&transcript)
                .with_context(|| format!("Failed to read {}", transcript.display()))?;
            let cues = parse_cues(&content);
            let listing: Vec<CueListing> = cues
                .iter()
                .map(|cue| CueListing {
                    cue,
                    frames: FrameRange::from_cue(cue, fps),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }

        Commands::Config { init } => {
            let settings = if init {
                let written = settings_manager.save(&ShortsSettings::default())?;
                info!(
                    "Wrote default settings to {}",
                    settings_manager.settings_path().display()
                );
                written
            } else {
                settings_manager.try_load()?
            };
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }

    Ok(())
}

/// Renames `from` to `to`, copying across filesystems when rename cannot
async fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Rename to {} failed ({}), copying instead", to.display(), e);
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await
        }
    }
}

fn ffmpeg_backend() -> Result<Arc<dyn MediaBackend>> {
    let info = detect_system_ffmpeg().context("FFmpeg is required")?;
    info!("Using FFmpeg {} at {}", info.version, info.ffmpeg_path.display());
    Ok(Arc::new(FFmpegRunner::new(info)))
}

/// Caption pipeline per settings; `None` when captions are turned off
fn caption_pipeline(
    settings: &ShortsSettings,
    backend: Arc<dyn MediaBackend>,
    fps: f64,
) -> Result<Option<CaptionPipeline>> {
    if !settings.pipeline.captions_enabled {
        return Ok(None);
    }
    let Some(transcriber) = create_transcriber(&settings.transcription)? else {
        warn!("No transcription provider configured; clips will not be captioned");
        return Ok(None);
    };
    info!("Transcribing with {}", transcriber.name());

    Ok(Some(CaptionPipeline::new(
        backend,
        transcriber,
        settings.overlay.clone(),
        settings.segment.render_settings(fps),
        settings.pipeline.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_move_file_renames() {
        let dir = tempfile::TempDir::new().unwrap();
        let from = dir.path().join("clip_with_captions.mp4");
        let to = dir.path().join("final.mp4");
        std::fs::write(&from, b"captioned").unwrap();

        move_file(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"captioned".to_vec());
    }

    #[tokio::test]
    async fn test_move_file_falls_back_to_copy() {
        // Renaming a file over a directory fails on every platform; the copy
        // path then reports its own error and leaves the source in place
        let dir = tempfile::TempDir::new().unwrap();
        let from = dir.path().join("clip_with_captions.mp4");
        let to = dir.path().join("occupied");
        std::fs::write(&from, b"captioned").unwrap();
        std::fs::create_dir(&to).unwrap();

        assert!(move_file(&from, &to).await.is_err());
        assert!(from.exists());
    }

    #[test]
    fn test_cli_parses_split() {
        let cli = Cli::try_parse_from([
            "shortreel", "split", "talk.mp4", "--count", "3", "--length", "30", "--existing", "2",
            "--no-captions",
        ])
        .unwrap();
        match cli.command {
            Commands::Split {
                count,
                length,
                existing,
                no_captions,
                fps,
                ..
            } => {
                assert_eq!(count, 3);
                assert_eq!(length, 30.0);
                assert_eq!(existing, 2);
                assert!(no_captions);
                assert!(fps.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
