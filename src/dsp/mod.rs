//! Signal processing building blocks shared by analysis and rendering

mod biquad;
mod effects;

pub use biquad::{Biquad, BiquadKind};
pub use effects::{FeedbackDelay, Limiter};
