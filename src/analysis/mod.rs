//! Audio analysis layer
//!
//! This module provides per-track analysis through a trait-based abstraction
//! over two external collaborators: a full feature extractor (stratum-dsp)
//! and a secondary tempo/phase detector. When the full extractor is not
//! available the analyzer runs in reduced mode.

mod analyzer;
mod context;
mod cues;
mod energy;
mod grid;
mod key;
mod stratum;
mod tempo;
mod traits;

pub use analyzer::{consensus, fold_tempo, FeatureAnalyzer, FALLBACK_BPM, FALLBACK_CONFIDENCE};
pub use context::{AnalysisContext, BackendMode};
pub use cues::detect_cue_points;
pub use energy::{calculate_rms, ENERGY_BUCKETS};
pub use grid::{lock_grid, BEATS_PER_BAR};
pub use key::{to_camelot, MusicalKey, Scale};
pub use stratum::StratumExtractor;
pub use tempo::{onset_times, OnsetTempoDetector};
pub use traits::{
    AnalysisStatus, BeatGrid, CuePoints, EnergyProfile, ExtractedFeatures, FeatureExtractor,
    LoopRegion, TempoDetector, TempoEstimate, TrackAnalysis,
};
