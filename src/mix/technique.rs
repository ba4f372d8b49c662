//! Transition techniques and per-style selection

use super::config::MixStyle;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How one track hands over to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionTechnique {
    HardCut,
    BassSwap,
    LongBlend,
    PhraseMixing,
    FilterSweep,
    EchoOut,
    LoopEcho,
    DropSwap,
    SlowEqBlend,
    /// Plain linear crossfade, used when nothing else applies
    Blend,
}

impl TransitionTechnique {
    /// Overlap length in bars
    ///
    /// `Blend` uses the configured transition length.
    pub fn overlap_bars(&self, default_bars: u32) -> u32 {
        match self {
            TransitionTechnique::HardCut => 0,
            TransitionTechnique::EchoOut => 4,
            TransitionTechnique::DropSwap | TransitionTechnique::LoopEcho => 8,
            TransitionTechnique::FilterSweep => 16,
            TransitionTechnique::BassSwap
            | TransitionTechnique::SlowEqBlend
            | TransitionTechnique::PhraseMixing => 32,
            TransitionTechnique::LongBlend => 64,
            TransitionTechnique::Blend => default_bars,
        }
    }

    /// Seconds of loop tail played after the track's nominal end, if any
    pub fn tail_seconds(&self) -> Option<f64> {
        match self {
            TransitionTechnique::LoopEcho => Some(16.0),
            TransitionTechnique::EchoOut | TransitionTechnique::DropSwap => Some(8.0),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransitionTechnique::HardCut => "Hard Cut",
            TransitionTechnique::BassSwap => "Bass Swap",
            TransitionTechnique::LongBlend => "Long Blend",
            TransitionTechnique::PhraseMixing => "Phrase Mixing",
            TransitionTechnique::FilterSweep => "Filter Sweep",
            TransitionTechnique::EchoOut => "Echo Out",
            TransitionTechnique::LoopEcho => "Loop Echo",
            TransitionTechnique::DropSwap => "Drop Swap",
            TransitionTechnique::SlowEqBlend => "Slow EQ Blend",
            TransitionTechnique::Blend => "Blend",
        }
    }
}

impl fmt::Display for TransitionTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Technique weights for each style
pub fn style_profile(style: MixStyle) -> &'static [(TransitionTechnique, f64)] {
    use TransitionTechnique::*;
    match style {
        MixStyle::Carola => &[(LongBlend, 0.4), (BassSwap, 0.35), (SlowEqBlend, 0.25)],
        MixStyle::Hawtin => &[(LoopEcho, 0.35), (FilterSweep, 0.35), (LongBlend, 0.3)],
        MixStyle::Cox => &[(HardCut, 0.3), (DropSwap, 0.3), (EchoOut, 0.2), (BassSwap, 0.2)],
        MixStyle::Villalobos => &[(LongBlend, 0.5), (PhraseMixing, 0.3), (SlowEqBlend, 0.2)],
        MixStyle::Dixon => &[(PhraseMixing, 0.4), (FilterSweep, 0.3), (BassSwap, 0.3)],
        MixStyle::Garnier => &[
            (BassSwap, 0.3),
            (PhraseMixing, 0.3),
            (EchoOut, 0.2),
            (HardCut, 0.2),
        ],
        MixStyle::Tiesto => &[(DropSwap, 0.4), (FilterSweep, 0.3), (EchoOut, 0.3)],
    }
}

/// Weighted draw from a style's profile
pub fn choose_technique<R: Rng + ?Sized>(style: MixStyle, rng: &mut R) -> TransitionTechnique {
    pick_weighted(style_profile(style), rng)
}

/// Draw `r` in `[0, total)` and walk the list subtracting weights
///
/// Falls back to [`TransitionTechnique::Blend`] for an empty profile or if
/// rounding lets the draw fall through.
pub fn pick_weighted<R: Rng + ?Sized>(
    profile: &[(TransitionTechnique, f64)],
    rng: &mut R,
) -> TransitionTechnique {
    let total: f64 = profile.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return TransitionTechnique::Blend;
    }

    let mut r = rng.gen_range(0.0..total);
    for &(technique, weight) in profile {
        if weight > r {
            return technique;
        }
        r -= weight;
    }
    TransitionTechnique::Blend
}
