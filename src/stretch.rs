//! Tempo matching by overlap-add resynthesis
//!
//! A naive OLA: Hann-windowed grains are read at `hop * speed_ratio` and
//! written at `hop`. There is no phase-vocoder correction, so pitch moves
//! with tempo the way it does on a turntable.

use crate::analysis::TrackAnalysis;
use crate::model::AudioBuffer;
use std::f32::consts::PI;

/// Grain length in samples
const WINDOW_SIZE: usize = 4096;
/// 50% overlap
const HOP_SIZE: usize = WINDOW_SIZE / 2;
/// Ratios this close to 1 are played untouched
const IDENTITY_TOLERANCE: f64 = 0.001;

/// A track resampled to the mix tempo
#[derive(Debug, Clone)]
pub struct StretchedTrack {
    pub buffer: AudioBuffer,
    /// `target_bpm / original_bpm`
    pub tempo: f64,
    pub analysis: TrackAnalysis,
}

impl StretchedTrack {
    /// Stretch `buffer` from the analysed tempo to `target_bpm`
    pub fn new(buffer: AudioBuffer, analysis: TrackAnalysis, target_bpm: f64) -> Self {
        let tempo = target_bpm / analysis.bpm;
        log::debug!(
            "Stretching {:.2} BPM -> {:.2} BPM (ratio {:.4})",
            analysis.bpm,
            target_bpm,
            tempo
        );
        Self {
            buffer: stretch(buffer, tempo),
            tempo,
            analysis,
        }
    }
}

/// Play `buffer` `speed_ratio` times faster
///
/// Output length is `floor(len / speed_ratio)`; ratios within 0.001 of 1
/// return the input as-is.
pub fn stretch(buffer: AudioBuffer, speed_ratio: f64) -> AudioBuffer {
    if (speed_ratio - 1.0).abs() < IDENTITY_TOLERANCE {
        return buffer;
    }

    let out_len = (buffer.len() as f64 / speed_ratio).floor() as usize;
    let window = hann_window(WINDOW_SIZE);

    let channels = buffer
        .channels
        .iter()
        .map(|input| overlap_add(input, out_len, speed_ratio, &window))
        .collect();

    AudioBuffer::new(buffer.sample_rate, channels)
}

fn overlap_add(input: &[f32], out_len: usize, speed_ratio: f64, window: &[f32]) -> Vec<f32> {
    let mut output = vec![0.0f32; out_len];
    let analysis_hop = HOP_SIZE as f64 * speed_ratio;

    let mut read_pos = 0.0f64;
    let mut write_pos = 0usize;

    loop {
        let read = read_pos.floor() as usize;
        if read + WINDOW_SIZE > input.len() || write_pos + WINDOW_SIZE > out_len {
            break;
        }

        let grain = &input[read..read + WINDOW_SIZE];
        let dest = &mut output[write_pos..write_pos + WINDOW_SIZE];
        for ((out, &sample), &w) in dest.iter_mut().zip(grain).zip(window) {
            *out += sample * w;
        }

        write_pos += HOP_SIZE;
        read_pos += analysis_hop;
    }

    output
}

/// Periodic Hann window; sums to 1 at 50% overlap
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / size as f32).cos())
        .collect()
}
