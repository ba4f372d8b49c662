//! Analysis trait definitions and data structures

use crate::error::Result;
use crate::model::{AudioBuffer, SourceSeconds};
use serde::{Deserialize, Serialize};

/// Full spectral feature extractor (tempo, onsets, key)
///
/// Implementations may be unavailable at runtime; see
/// [`AnalysisContext`](super::AnalysisContext) for how absence is handled.
pub trait FeatureExtractor: Send + Sync {
    /// Extract features from mono samples
    fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<ExtractedFeatures>;
}

/// Independent tempo/phase estimator, used as a cross-check and as the sole
/// tempo source in reduced mode
pub trait TempoDetector: Send + Sync {
    fn detect(&self, buffer: &AudioBuffer) -> Result<TempoEstimate>;
}

/// Raw output of a [`FeatureExtractor`]
#[derive(Debug, Clone)]
pub struct ExtractedFeatures {
    pub bpm: f64,
    /// Confidence (0.0-1.0)
    pub confidence: f64,
    /// Onset times in seconds
    pub onsets: Vec<f64>,
    /// Pitch class name, e.g. "F#"
    pub key: String,
    /// "major" or "minor"
    pub scale: String,
}

/// Raw output of a [`TempoDetector`]
#[derive(Debug, Clone, Copy)]
pub struct TempoEstimate {
    pub bpm: f64,
    /// Position of the first beat in seconds
    pub offset: f64,
}

/// Lifecycle of one track's analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Ready,
    Error,
}

/// Beat grid information
///
/// All positions are seconds in original track time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// BPM (beats per minute)
    pub bpm: f64,

    /// Phase of the first beat, in milliseconds
    pub offset_ms: f64,

    /// Beat positions
    pub beats: Vec<f64>,

    /// Downbeat positions (first beat of each bar)
    pub downbeats: Vec<f64>,
}

/// Per-band RMS over fixed time buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfile {
    pub low: Vec<f32>,
    pub mid: Vec<f32>,
    pub high: Vec<f32>,
}

impl EnergyProfile {
    pub fn len(&self) -> usize {
        self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopRegion {
    pub start: SourceSeconds,
    pub end: SourceSeconds,
}

/// Structural cue points in original track time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuePoints {
    /// Where the mix enters the track
    pub start: SourceSeconds,
    /// Where the track starts handing over (outro)
    pub end: SourceSeconds,
    /// Four bars ending at the outro, used for echo tails
    pub loop_region: LoopRegion,
}

/// Complete analysis result for a track
///
/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackAnalysis {
    pub bpm: f64,
    /// Camelot code, or the raw key string if unmapped
    pub key: String,
    pub beat_grid: BeatGrid,
    pub energy: EnergyProfile,
    pub cue_points: CuePoints,
    /// Loudness normalisation factor
    pub gain_factor: f32,
    /// Low-band dispersion, 0-100
    pub groove_index: f64,
    /// 0.0-1.0
    pub confidence: f64,
    pub status: AnalysisStatus,
    pub duration: SourceSeconds,
}
