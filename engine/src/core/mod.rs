//! Shortreel Core Engine
//!
//! Segmentation, transcription and caption-overlay pipeline for turning a
//! long video into captioned vertical shorts.

pub mod captions;
pub mod ffmpeg;
pub mod fs;
pub mod pipeline;
pub mod process;
pub mod segment;
pub mod settings;
pub mod transcription;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod test_support;
