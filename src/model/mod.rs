//! Core data model shared by analysis, stretching, and rendering
//!
//! Audio buffers and the two time bases (original track time vs. mix time).

mod audio;
mod time;

pub use audio::{AudioBuffer, RENDER_CHANNELS, RENDER_SAMPLE_RATE};
pub use time::{RenderSeconds, SourceSeconds};
