//! Shortreel Core Library
//!
//! Batches a long video into vertical shorts and burns transcript captions
//! into each clip. The binary in `crates/shortreel-cli` is a thin shell over
//! [`core::segment::SegmentDriver`] and [`core::pipeline::CaptionPipeline`].

pub mod core;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;

// =============================================================================
// Logging
// =============================================================================

/// Installs the global tracing subscriber.
///
/// Logs go to stdout, and to a daily-rolling `shortreel.log` in `log_dir`
/// when one is given. `RUST_LOG` overrides the default level. Keep the
/// returned guard alive for the file writer to flush.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(cfg!(debug_assertions));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let _ = std::fs::create_dir_all(dir);
            let file_appender = tracing_appender::rolling::daily(dir, "shortreel.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);

    // Already initialized in tests
    let _ = tracing::subscriber::set_global_default(subscriber);
    guard
}
