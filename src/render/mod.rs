//! Offline rendering of a scheduled mix to WAV

mod engine;
mod param;
mod pipeline;
mod wav;

pub use engine::{RenderEngine, BLOCK_SIZE};
pub use param::AutomationLane;
pub use pipeline::{RenderOutput, RenderPipeline, Transition};
pub use wav::encode_wav;
