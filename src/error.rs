//! Error taxonomy for the mix pipeline
//!
//! Per-track failures (`Decode`, `AnalysisCrash`, `DegenerateEvent`) are isolated
//! by the pipeline and never abort sibling tracks. Only whole-batch failures
//! reach the caller of a mix request.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MixError {
    /// Source audio could not be decoded; aborts only that track
    #[error("Failed to decode track '{track}': {reason}")]
    Decode { track: String, reason: String },

    /// Full feature extractor could not be initialized
    #[error("Feature extraction backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Full backend failed part way through a track
    #[error("Feature extraction crashed: {0}")]
    AnalysisCrash(String),

    /// Nothing left to mix
    #[error("No valid tracks to mix")]
    NoValidTracks,

    /// A scheduled clip with unusable timing
    #[error("Degenerate event for track {track}: {reason}")]
    DegenerateEvent { track: usize, reason: String },

    /// Tempo detection had nothing to work with
    #[error("Tempo detection failed: {0}")]
    TempoDetection(String),

    /// Sample rate conversion failed; surfaced as a `Decode` error for the track
    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("WAV encoding failed: {0}")]
    Encode(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<hound::Error> for MixError {
    fn from(e: hound::Error) -> Self {
        MixError::Encode(e.to_string())
    }
}

impl From<rubato::ResamplerConstructionError> for MixError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        MixError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for MixError {
    fn from(e: rubato::ResampleError) -> Self {
        MixError::Resample(e.to_string())
    }
}

/// Result type for mix operations
pub type Result<T> = std::result::Result<T, MixError>;
