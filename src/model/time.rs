//! Two time bases used throughout the mix
//!
//! `SourceSeconds` are positions in the original, unstretched track.
//! `RenderSeconds` are positions in stretched-buffer or mix time. The only way
//! across is [`SourceSeconds::stretched`], which divides by the tempo ratio.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A position or length in original track time
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct SourceSeconds(pub f64);

/// A position or length in stretched / mix time
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct RenderSeconds(pub f64);

impl SourceSeconds {
    /// Rescale into stretched time for a track played `tempo` times faster
    pub fn stretched(self, tempo: f64) -> RenderSeconds {
        RenderSeconds(self.0 / tempo)
    }

    pub fn seconds(self) -> f64 {
        self.0
    }
}

impl RenderSeconds {
    pub const ZERO: RenderSeconds = RenderSeconds(0.0);

    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    pub fn max(self, other: RenderSeconds) -> RenderSeconds {
        RenderSeconds(self.0.max(other.0))
    }

    pub fn min(self, other: RenderSeconds) -> RenderSeconds {
        RenderSeconds(self.0.min(other.0))
    }

    /// Sample index at the given rate (floored, never negative)
    pub fn to_samples(self, sample_rate: u32) -> usize {
        (self.0 * sample_rate as f64).max(0.0).floor() as usize
    }
}

impl Add for RenderSeconds {
    type Output = RenderSeconds;

    fn add(self, rhs: RenderSeconds) -> RenderSeconds {
        RenderSeconds(self.0 + rhs.0)
    }
}

impl Sub for RenderSeconds {
    type Output = RenderSeconds;

    fn sub(self, rhs: RenderSeconds) -> RenderSeconds {
        RenderSeconds(self.0 - rhs.0)
    }
}
