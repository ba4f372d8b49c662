//! Secondary tempo and phase detection
//!
//! This module provides an estimator that is independent of the full feature
//! backend:
//! 1. Build an onset-strength envelope (positive energy flux per hop)
//! 2. Pick the tempo from the envelope's autocorrelation
//! 3. Find the phase by aligning a comb at that period with the envelope

use super::traits::{TempoDetector, TempoEstimate};
use crate::error::{MixError, Result};
use crate::model::AudioBuffer;

/// Samples per envelope frame
const HOP_SIZE: usize = 256;
/// Tempo search range
const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;
/// Shortest audio worth analysing, in hops
const MIN_HOPS: usize = 10;
/// Onset peaks must exceed the mean flux by this many standard deviations
const ONSET_THRESHOLD_STD: f64 = 2.0;
/// Minimum distance between reported onsets, in seconds
const MIN_ONSET_SPACING: f64 = 0.05;

/// Autocorrelation tempo detector over an energy-flux envelope
#[derive(Debug, Clone, Default)]
pub struct OnsetTempoDetector;

impl OnsetTempoDetector {
    pub fn new() -> Self {
        Self
    }
}

impl TempoDetector for OnsetTempoDetector {
    fn detect(&self, buffer: &AudioBuffer) -> Result<TempoEstimate> {
        let mono = buffer.to_mono();
        let sample_rate = buffer.sample_rate as f64;
        let hop_time = HOP_SIZE as f64 / sample_rate;

        let flux = onset_envelope(&mono);
        if flux.len() < MIN_HOPS {
            return Err(MixError::TempoDetection(
                "Audio too short for tempo detection".to_string(),
            ));
        }

        let mean = flux.iter().sum::<f64>() / flux.len() as f64;
        if mean <= 0.0 {
            return Err(MixError::TempoDetection("No onset energy".to_string()));
        }
        let centered: Vec<f64> = flux.iter().map(|v| v - mean).collect();

        let min_lag = (60.0 / (MAX_BPM * hop_time)).floor().max(1.0) as usize;
        let max_lag = ((60.0 / (MIN_BPM * hop_time)).ceil() as usize).min(centered.len() - 1);
        if max_lag <= min_lag + 1 {
            return Err(MixError::TempoDetection(
                "Audio too short for tempo range".to_string(),
            ));
        }

        let acf: Vec<f64> = (0..=max_lag)
            .map(|lag| {
                if lag < min_lag {
                    return 0.0;
                }
                centered[..centered.len() - lag]
                    .iter()
                    .zip(&centered[lag..])
                    .map(|(a, b)| a * b)
                    .sum()
            })
            .collect();

        let best = (min_lag..=max_lag)
            .max_by(|&a, &b| acf[a].total_cmp(&acf[b]))
            .ok_or_else(|| MixError::TempoDetection("Empty lag range".to_string()))?;

        if acf[best] <= 0.0 {
            return Err(MixError::TempoDetection(
                "No periodicity in onset envelope".to_string(),
            ));
        }

        let period = refine_peak(&acf, best, min_lag, max_lag);
        let bpm = 60.0 / (period * hop_time);
        let offset = best_phase(&flux, period) as f64 * hop_time;

        log::debug!(
            "Secondary tempo estimate: {:.2} BPM, offset {:.3}s (lag {:.2} hops)",
            bpm,
            offset,
            period
        );

        Ok(TempoEstimate { bpm, offset })
    }
}

/// Positive frame-to-frame energy difference
fn onset_envelope(samples: &[f32]) -> Vec<f64> {
    let energies: Vec<f64> = samples
        .chunks_exact(HOP_SIZE)
        .map(|frame| frame.iter().map(|&s| (s as f64) * (s as f64)).sum())
        .collect();

    let mut flux = Vec::with_capacity(energies.len());
    flux.push(energies.first().copied().unwrap_or(0.0));
    flux.extend(energies.windows(2).map(|w| (w[1] - w[0]).max(0.0)));
    flux
}

/// Onset times in seconds: local maxima of the flux envelope that stand
/// clearly above its average
pub fn onset_times(samples: &[f32], sample_rate: u32) -> Vec<f64> {
    let flux = onset_envelope(samples);
    if flux.len() < 3 {
        return Vec::new();
    }
    let n = flux.len() as f64;
    let mean = flux.iter().sum::<f64>() / n;
    let std = (flux.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    let threshold = mean + ONSET_THRESHOLD_STD * std;
    let hop_time = HOP_SIZE as f64 / sample_rate as f64;

    let mut onsets: Vec<f64> = Vec::new();
    for i in 1..flux.len() - 1 {
        let is_peak = flux[i] > threshold && flux[i] >= flux[i - 1] && flux[i] > flux[i + 1];
        if !is_peak {
            continue;
        }
        let t = i as f64 * hop_time;
        if onsets.last().map_or(true, |&last| t - last >= MIN_ONSET_SPACING) {
            onsets.push(t);
        }
    }
    onsets
}

/// Parabolic interpolation around an autocorrelation peak
fn refine_peak(acf: &[f64], idx: usize, min_lag: usize, max_lag: usize) -> f64 {
    if idx <= min_lag || idx >= max_lag {
        return idx as f64;
    }
    let (a, b, c) = (acf[idx - 1], acf[idx], acf[idx + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < f64::EPSILON {
        return idx as f64;
    }
    let shift = (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
    idx as f64 + shift
}

/// Comb offset (in hops) with the most onset energy
fn best_phase(flux: &[f64], period: f64) -> usize {
    let span = period.round().max(1.0) as usize;
    (0..span)
        .max_by(|&a, &b| comb_score(flux, a, period).total_cmp(&comb_score(flux, b, period)))
        .unwrap_or(0)
}

fn comb_score(flux: &[f64], offset: usize, period: f64) -> f64 {
    let mut score = 0.0;
    let mut k = 0usize;
    loop {
        let idx = (offset as f64 + k as f64 * period).round() as usize;
        if idx >= flux.len() {
            break;
        }
        score += flux[idx];
        k += 1;
    }
    score
}
