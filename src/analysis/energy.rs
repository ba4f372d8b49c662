//! Energy profile, groove index, and loudness normalisation
//!
//! The energy profile is a coarse 3-band RMS envelope with a fixed number of
//! buckets spanning the whole track, used by cue detection and the groove
//! metric.

use super::traits::EnergyProfile;
use crate::dsp::Biquad;

/// Number of time buckets in an energy profile
pub const ENERGY_BUCKETS: usize = 200;
/// Low/mid crossover
const LOW_CROSSOVER_HZ: f64 = 250.0;
/// Mid/high crossover
const HIGH_CROSSOVER_HZ: f64 = 4000.0;
/// Only every Nth sample contributes to the loudness estimate
const GAIN_STRIDE: usize = 16;
/// Loudness every track is normalised to
const TARGET_RMS: f32 = 0.20;
const MIN_GAIN: f32 = 0.5;
const MAX_GAIN: f32 = 2.0;
/// Standard deviation that maps to a groove index of 100
const GROOVE_FULL_SCALE: f64 = 0.1;

/// Band-split energy profile (full backend)
pub fn banded_profile(samples: &[f32], sample_rate: u32) -> EnergyProfile {
    if samples.len() < ENERGY_BUCKETS {
        return EnergyProfile::default();
    }

    let sr = sample_rate as f64;
    let mut low = samples.to_vec();
    Biquad::lowpass(LOW_CROSSOVER_HZ, 0.707, sr).process_in_place(&mut low);

    let mut high = samples.to_vec();
    Biquad::highpass(HIGH_CROSSOVER_HZ, 0.707, sr).process_in_place(&mut high);

    let mut mid = samples.to_vec();
    Biquad::highpass(LOW_CROSSOVER_HZ, 0.707, sr).process_in_place(&mut mid);
    Biquad::lowpass(HIGH_CROSSOVER_HZ, 0.707, sr).process_in_place(&mut mid);

    EnergyProfile {
        low: bucket_rms(&low),
        mid: bucket_rms(&mid),
        high: bucket_rms(&high),
    }
}

/// Single-band energy profile copied into all three bands (reduced backend)
pub fn flat_profile(samples: &[f32]) -> EnergyProfile {
    if samples.len() < ENERGY_BUCKETS {
        return EnergyProfile::default();
    }
    let band = bucket_rms(samples);
    EnergyProfile {
        low: band.clone(),
        mid: band.clone(),
        high: band,
    }
}

/// RMS of each of the `ENERGY_BUCKETS` equal slices
fn bucket_rms(samples: &[f32]) -> Vec<f32> {
    let per_bucket = samples.len() / ENERGY_BUCKETS;
    (0..ENERGY_BUCKETS)
        .map(|b| {
            let start = b * per_bucket;
            let end = if b + 1 == ENERGY_BUCKETS {
                samples.len()
            } else {
                start + per_bucket
            };
            calculate_rms(&samples[start..end])
        })
        .collect()
}

/// Dispersion of the low band, scaled to 0-100
pub fn groove_index(profile: &EnergyProfile) -> f64 {
    let n = profile.low.len();
    if n == 0 {
        return 0.0;
    }
    let mean = profile.low.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let variance = profile
        .low
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n as f64;
    (variance.sqrt() / GROOVE_FULL_SCALE * 100.0).clamp(0.0, 100.0)
}

/// Gain that brings the track to the target RMS
///
/// Silent input gets unity gain rather than the maximum boost.
pub fn gain_factor(samples: &[f32]) -> f32 {
    let strided: Vec<f32> = samples.iter().step_by(GAIN_STRIDE).copied().collect();
    let rms = calculate_rms(&strided);
    if rms < 1e-6 {
        return 1.0;
    }
    (TARGET_RMS / rms).clamp(MIN_GAIN, MAX_GAIN)
}

/// Calculate RMS for a sample chunk
#[inline]
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}
