//! Beatmix - tempo-locked automatic DJ mixer
//!
//! This library takes a list of tracks, analyzes each one for tempo, beat
//! grid, key and structure, stretches them to a common tempo, and renders a
//! continuous mix with style-dependent transitions to a WAV file.

pub mod analysis;
pub mod automation;
pub mod decode;
pub mod dsp;
pub mod error;
pub mod mix;
pub mod model;
pub mod render;
pub mod stretch;

pub use analysis::AnalysisContext;
pub use error::{MixError, Result};
pub use mix::{MixConfiguration, MixOutput, MixPipeline, MixStyle, TrackInput};
