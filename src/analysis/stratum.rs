//! Full feature backend using stratum-dsp
//!
//! stratum-dsp provides tempo, tempo confidence and key from its chroma-based
//! analysis. Onset ticks come from our own energy-flux envelope so that the
//! grid locker gets per-onset evidence regardless of the backend's grid.

use super::key::MusicalKey;
use super::tempo::onset_times;
use super::traits::{ExtractedFeatures, FeatureExtractor};
use crate::error::{MixError, Result};
use std::panic::{self, AssertUnwindSafe};
use stratum_dsp::{analyze_audio, AnalysisConfig};

/// Shortest input the backend is given, in seconds
const MIN_ANALYSIS_SECONDS: usize = 1;

/// stratum-dsp backed feature extractor
#[derive(Debug, Clone, Default)]
pub struct StratumExtractor;

impl StratumExtractor {
    /// Initialize the backend
    ///
    /// stratum-dsp is linked statically, so this only fails if the crate's
    /// default configuration cannot be built.
    pub fn initialize() -> Result<Self> {
        panic::catch_unwind(AnalysisConfig::default)
            .map_err(|_| MixError::BackendUnavailable("stratum-dsp configuration panicked".into()))?;
        log::debug!("stratum-dsp backend initialized");
        Ok(Self)
    }
}

impl FeatureExtractor for StratumExtractor {
    fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<ExtractedFeatures> {
        if samples.len() < sample_rate as usize * MIN_ANALYSIS_SECONDS {
            return Err(MixError::AnalysisCrash(
                "Audio too short for analysis".to_string(),
            ));
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            analyze_audio(samples, sample_rate, AnalysisConfig::default())
        }))
        .map_err(|_| MixError::AnalysisCrash("stratum-dsp panicked".to_string()))?
        .map_err(|e| MixError::AnalysisCrash(format!("Audio analysis failed: {:?}", e)))?;

        let raw_key = result.key.name();
        let (key, scale) = match MusicalKey::parse(&raw_key) {
            Some(k) => (k.tonic().to_string(), k.scale.name().to_string()),
            None => {
                log::warn!("Could not map key: {}", raw_key);
                (raw_key.to_string(), String::new())
            }
        };

        let onsets = onset_times(samples, sample_rate);

        log::debug!(
            "stratum-dsp: BPM={:.1} (confidence {:.2}), key={} {}, {} onsets",
            result.bpm,
            result.bpm_confidence,
            key,
            scale,
            onsets.len()
        );

        Ok(ExtractedFeatures {
            bpm: result.bpm as f64,
            confidence: result.bpm_confidence as f64,
            onsets,
            key,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_requires_audio() {
        let extractor = StratumExtractor::initialize().unwrap();
        let result = extractor.extract(&[0.0; 100], 44100);
        assert!(matches!(result, Err(MixError::AnalysisCrash(_))));
    }
}
