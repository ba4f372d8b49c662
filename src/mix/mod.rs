//! Mix assembly
//!
//! Configuration, transition selection, timeline building and the batch
//! pipeline that ties analysis, scheduling and rendering together.

pub mod config;
pub mod pipeline;
mod technique;
mod timeline;

pub use config::{MixConfiguration, MixStyle, DEFAULT_TARGET_BPM, DEFAULT_TRANSITION_BARS};
pub use pipeline::{MixOutput, MixPipeline, TrackInput, TrackReport};
pub use technique::{choose_technique, pick_weighted, style_profile, TransitionTechnique};
pub use timeline::{MixTimeline, MixTimelineBuilder, TimelineEvent, SAFETY_TAIL};
