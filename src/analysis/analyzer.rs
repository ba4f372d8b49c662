//! Per-track feature analysis
//!
//! Runs the full backend when the session has one, falls back to the reduced
//! backend when it does not (or when the full backend fails on a track), and
//! applies the same post-processing to both: tempo folding, grid locking,
//! groove index, gain factor, and cue detection.

use super::context::AnalysisContext;
use super::cues::detect_cue_points;
use super::energy::{banded_profile, flat_profile, gain_factor, groove_index};
use super::grid::lock_grid;
use super::key::{to_camelot, DEFAULT_CAMELOT};
use super::traits::{
    AnalysisStatus, EnergyProfile, FeatureExtractor, TempoDetector, TempoEstimate, TrackAnalysis,
};
use crate::error::Result;
use crate::model::AudioBuffer;

/// Tempo used when nothing usable was detected
pub const FALLBACK_BPM: f64 = 125.0;
/// Confidence reported with the fallback tempo
pub const FALLBACK_CONFIDENCE: f64 = 0.1;
/// Folding range
const FOLD_LOW: f64 = 80.0;
const FOLD_HIGH: f64 = 160.0;
/// Anything below this after folding is unusable
const MIN_VALID_BPM: f64 = 60.0;

/// Two estimates this close are considered the same tempo
const AGREE_TOLERANCE: f64 = 2.0;
/// Tolerance for double/half tempo matches
const OCTAVE_TOLERANCE: f64 = 3.0;
const AGREE_BOOST: f64 = 0.2;
const MAX_CONFIDENCE: f64 = 0.99;
const OCTAVE_CONFIDENCE_FLOOR: f64 = 0.7;
const DISAGREE_PENALTY: f64 = 0.2;
const MIN_CONFIDENCE: f64 = 0.1;

const REDUCED_CONFIDENCE: f64 = 0.3;
const REDUCED_CONFIDENCE_DETECTED: f64 = 0.6;

/// What a backend produced before shared post-processing
#[derive(Debug, Clone)]
struct BackendEstimate {
    bpm: f64,
    confidence: f64,
    onsets: Vec<f64>,
    /// Externally supplied grid phase, if a backend trusts one
    phase: Option<f64>,
    key: String,
    energy: EnergyProfile,
}

/// Track analyzer bound to a session's [`AnalysisContext`]
pub struct FeatureAnalyzer<'a> {
    context: &'a AnalysisContext,
}

impl<'a> FeatureAnalyzer<'a> {
    pub fn new(context: &'a AnalysisContext) -> Self {
        Self { context }
    }

    /// Analyze one decoded track
    ///
    /// Never fails: backend problems show up as low confidence.
    pub fn analyze(&self, buffer: &AudioBuffer) -> TrackAnalysis {
        let mono = buffer.to_mono();
        let detector = self.context.detector();

        let estimate = match self.context.extractor() {
            Some(extractor) => match full_estimate(extractor, detector, buffer, &mono) {
                Ok(estimate) => estimate,
                Err(e) => {
                    log::warn!("{} - retrying track with reduced analysis", e);
                    reduced_estimate(detector, buffer, &mono)
                }
            },
            None => reduced_estimate(detector, buffer, &mono),
        };

        finish(estimate, buffer, &mono)
    }
}

/// Full backend: external extractor cross-checked by the secondary detector
fn full_estimate(
    extractor: &dyn FeatureExtractor,
    detector: &dyn TempoDetector,
    buffer: &AudioBuffer,
    mono: &[f32],
) -> Result<BackendEstimate> {
    let features = extractor.extract(mono, buffer.sample_rate)?;
    let energy = banded_profile(mono, buffer.sample_rate);

    let secondary = match detector.detect(buffer) {
        Ok(estimate) => Some(estimate),
        Err(e) => {
            log::debug!("Secondary tempo detector failed: {}", e);
            None
        }
    };
    let (bpm, confidence, phase) = consensus(features.bpm, features.confidence, secondary);

    Ok(BackendEstimate {
        bpm,
        confidence,
        onsets: features.onsets,
        phase,
        key: to_camelot(&features.key, &features.scale),
        energy,
    })
}

/// Reduced backend: secondary detector only, no spectral split, generic key
fn reduced_estimate(
    detector: &dyn TempoDetector,
    buffer: &AudioBuffer,
    mono: &[f32],
) -> BackendEstimate {
    let (bpm, confidence, phase) = match detector.detect(buffer) {
        Ok(estimate) => (estimate.bpm, REDUCED_CONFIDENCE_DETECTED, Some(estimate.offset)),
        Err(e) => {
            log::warn!("Tempo detection failed: {}", e);
            (0.0, REDUCED_CONFIDENCE, None)
        }
    };

    BackendEstimate {
        bpm,
        confidence,
        onsets: Vec::new(),
        phase,
        key: DEFAULT_CAMELOT.to_string(),
        energy: flat_profile(mono),
    }
}

/// Reconcile the primary tempo with the secondary estimate
///
/// Returns `(bpm, confidence, phase)`.
pub fn consensus(
    primary_bpm: f64,
    primary_confidence: f64,
    secondary: Option<TempoEstimate>,
) -> (f64, f64, Option<f64>) {
    let Some(second) = secondary else {
        return (primary_bpm, primary_confidence, None);
    };

    if (primary_bpm - second.bpm).abs() <= AGREE_TOLERANCE {
        log::debug!(
            "Tempo consensus: {:.2} / {:.2} agree",
            primary_bpm,
            second.bpm
        );
        (
            (primary_bpm + second.bpm) / 2.0,
            (primary_confidence + AGREE_BOOST).min(MAX_CONFIDENCE),
            Some(second.offset),
        )
    } else if (primary_bpm - second.bpm * 2.0).abs() <= OCTAVE_TOLERANCE
        || (primary_bpm - second.bpm / 2.0).abs() <= OCTAVE_TOLERANCE
    {
        log::debug!(
            "Tempo consensus: {:.2} / {:.2} are an octave apart",
            primary_bpm,
            second.bpm
        );
        (
            primary_bpm,
            primary_confidence.max(OCTAVE_CONFIDENCE_FLOOR),
            Some(second.offset),
        )
    } else {
        log::debug!(
            "Tempo consensus: {:.2} / {:.2} disagree, keeping primary",
            primary_bpm,
            second.bpm
        );
        (
            primary_bpm,
            (primary_confidence - DISAGREE_PENALTY).max(MIN_CONFIDENCE),
            None,
        )
    }
}

/// Fold into the DJ tempo range, once in each direction
///
/// Anything still outside `[60, 160]`, or non-finite, becomes the fallback.
pub fn fold_tempo(bpm: f64, confidence: f64) -> (f64, f64) {
    let mut folded = bpm;
    if folded < FOLD_LOW {
        folded *= 2.0;
    }
    if folded > FOLD_HIGH {
        folded /= 2.0;
    }

    if !folded.is_finite() || folded == 0.0 || folded < MIN_VALID_BPM || folded > FOLD_HIGH {
        log::warn!(
            "Unusable tempo {:.2} BPM, falling back to {} BPM",
            bpm,
            FALLBACK_BPM
        );
        return (FALLBACK_BPM, FALLBACK_CONFIDENCE);
    }

    if folded != bpm {
        log::debug!("BPM folded from {:.2} to {:.2}", bpm, folded);
    }
    (folded, confidence)
}

fn finish(estimate: BackendEstimate, buffer: &AudioBuffer, mono: &[f32]) -> TrackAnalysis {
    let source_duration = buffer.source_duration();
    let duration = source_duration.seconds();
    let (bpm, confidence) = fold_tempo(estimate.bpm, estimate.confidence);

    let beat_grid = lock_grid(&estimate.onsets, bpm, duration, estimate.phase);
    let groove = groove_index(&estimate.energy);
    let gain = gain_factor(mono);
    let cue_points = detect_cue_points(&estimate.energy, &beat_grid, bpm, duration);

    log::info!(
        "Analysis complete: BPM={:.1} (confidence {:.2}), key={}, groove={:.0}, gain={:.2}, cues {:.1}s-{:.1}s",
        bpm,
        confidence,
        estimate.key,
        groove,
        gain,
        cue_points.start.seconds(),
        cue_points.end.seconds()
    );

    TrackAnalysis {
        bpm,
        key: estimate.key,
        beat_grid,
        energy: estimate.energy,
        cue_points,
        gain_factor: gain,
        groove_index: groove,
        confidence: confidence.clamp(0.0, 1.0),
        status: AnalysisStatus::Ready,
        duration: source_duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tempo::tests::click_track;
    use crate::analysis::traits::ExtractedFeatures;
    use crate::error::MixError;

    struct FixedExtractor(f64);

    impl FeatureExtractor for FixedExtractor {
        fn extract(&self, _samples: &[f32], _sample_rate: u32) -> Result<ExtractedFeatures> {
            Ok(ExtractedFeatures {
                bpm: self.0,
                confidence: 0.5,
                onsets: vec![],
                key: "A".to_string(),
                scale: "minor".to_string(),
            })
        }
    }

    struct CrashingExtractor;

    impl FeatureExtractor for CrashingExtractor {
        fn extract(&self, _samples: &[f32], _sample_rate: u32) -> Result<ExtractedFeatures> {
            Err(MixError::AnalysisCrash("boom".into()))
        }
    }

    struct FixedDetector(Option<TempoEstimate>);

    impl TempoDetector for FixedDetector {
        fn detect(&self, _buffer: &AudioBuffer) -> Result<TempoEstimate> {
            self.0
                .ok_or_else(|| MixError::TempoDetection("no tempo".into()))
        }
    }

    fn estimate(bpm: f64, offset: f64) -> Option<TempoEstimate> {
        Some(TempoEstimate { bpm, offset })
    }

    #[test]
    fn test_consensus_agree() {
        let (bpm, conf, phase) = consensus(124.0, 0.5, estimate(125.5, 0.12));
        assert!((bpm - 124.75).abs() < 1e-9);
        assert!((conf - 0.7).abs() < 1e-9);
        assert_eq!(phase, Some(0.12));

        let (_, conf, _) = consensus(124.0, 0.95, estimate(124.0, 0.0));
        assert_eq!(conf, 0.99);
    }

    #[test]
    fn test_consensus_octave() {
        let (bpm, conf, phase) = consensus(130.0, 0.4, estimate(64.0, 0.3));
        assert_eq!(bpm, 130.0);
        assert_eq!(conf, 0.7);
        assert_eq!(phase, Some(0.3));

        let (bpm, conf, _) = consensus(70.0, 0.9, estimate(141.0, 0.3));
        assert_eq!(bpm, 70.0);
        assert_eq!(conf, 0.9);
    }

    #[test]
    fn test_consensus_disagree() {
        let (bpm, conf, phase) = consensus(128.0, 0.25, estimate(100.0, 0.3));
        assert_eq!(bpm, 128.0);
        assert!((conf - 0.1).abs() < 1e-9);
        assert_eq!(phase, None);
    }

    #[test]
    fn test_fold_tempo() {
        assert_eq!(fold_tempo(70.0, 0.8), (140.0, 0.8));
        assert_eq!(fold_tempo(174.0, 0.8), (87.0, 0.8));
        assert_eq!(fold_tempo(125.0, 0.8), (125.0, 0.8));
        assert_eq!(fold_tempo(20.0, 0.8), (FALLBACK_BPM, FALLBACK_CONFIDENCE));
        assert_eq!(fold_tempo(0.0, 0.8), (FALLBACK_BPM, FALLBACK_CONFIDENCE));
        assert_eq!(fold_tempo(f64::NAN, 0.8), (FALLBACK_BPM, FALLBACK_CONFIDENCE));
        assert_eq!(fold_tempo(500.0, 0.8), (FALLBACK_BPM, FALLBACK_CONFIDENCE));
    }

    #[test]
    fn test_fold_range_property() {
        let mut bpm = 1.0;
        while bpm < 400.0 {
            let (folded, conf) = fold_tempo(bpm, 0.5);
            assert!(
                (60.0..=160.0).contains(&folded) || (folded == FALLBACK_BPM && conf == 0.1),
                "{} -> {}",
                bpm,
                folded
            );
            bpm += 0.7;
        }
    }

    #[test]
    fn test_full_backend_path() {
        let ctx = AnalysisContext::with_backends(
            || Ok(Box::new(FixedExtractor(126.0)) as Box<dyn FeatureExtractor>),
            FixedDetector(estimate(125.0, 0.2)),
        );
        let buffer = click_track(125.0, 0.2, 30.0, 44100);
        let analysis = FeatureAnalyzer::new(&ctx).analyze(&buffer);

        assert_eq!(analysis.status, AnalysisStatus::Ready);
        assert!((analysis.bpm - 125.5).abs() < 1e-9);
        assert!((analysis.confidence - 0.7).abs() < 1e-9);
        assert_eq!(analysis.key, "8A");
        assert!((analysis.beat_grid.offset_ms - 200.0).abs() < 1e-6);
        assert_eq!(analysis.energy.low.len(), 200);
        assert_ne!(analysis.energy.low, analysis.energy.high);
    }

    #[test]
    fn test_crash_retries_reduced() {
        let ctx = AnalysisContext::with_backends(
            || Ok(Box::new(CrashingExtractor) as Box<dyn FeatureExtractor>),
            FixedDetector(estimate(122.0, 0.1)),
        );
        let buffer = click_track(122.0, 0.1, 30.0, 44100);
        let analysis = FeatureAnalyzer::new(&ctx).analyze(&buffer);

        assert_eq!(analysis.status, AnalysisStatus::Ready);
        assert_eq!(analysis.bpm, 122.0);
        assert_eq!(analysis.confidence, 0.6);
        assert_eq!(analysis.key, DEFAULT_CAMELOT);
        assert_eq!(analysis.energy.low, analysis.energy.mid);
    }

    #[test]
    fn test_reduced_without_tempo_falls_back() {
        let ctx = AnalysisContext::with_backends(
            || Err(MixError::BackendUnavailable("missing".into())),
            FixedDetector(None),
        );
        let buffer = AudioBuffer::silent(44100, 2, 44100 * 30);
        let analysis = FeatureAnalyzer::new(&ctx).analyze(&buffer);

        assert_eq!(analysis.bpm, FALLBACK_BPM);
        assert_eq!(analysis.confidence, FALLBACK_CONFIDENCE);
        assert_eq!(analysis.gain_factor, 1.0);
        assert_eq!(analysis.duration, crate::model::SourceSeconds(30.0));
        // 30s at 125 BPM from phase 0
        assert_eq!(analysis.beat_grid.beats.len(), 62);
    }

    #[test]
    fn test_reduced_with_real_detector() {
        let ctx = AnalysisContext::reduced();
        let buffer = click_track(128.0, 0.0, 40.0, 44100);
        let analysis = FeatureAnalyzer::new(&ctx).analyze(&buffer);
        assert!((analysis.bpm - 128.0).abs() < 2.0, "bpm {}", analysis.bpm);
        assert_eq!(analysis.confidence, 0.6);
        let cues = analysis.cue_points;
        assert!(cues.start.0 <= cues.loop_region.start.0);
        assert!(cues.loop_region.end.0 <= cues.end.0);
        assert!(cues.end.0 <= 40.0);
    }
}
