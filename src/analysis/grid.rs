//! Beat grid locking
//!
//! Turns a tempo estimate and (possibly sparse) onset evidence into a regular
//! grid that spans the whole track.

use super::traits::BeatGrid;

/// Maximum number of onsets used for the statistical phase estimate
const MAX_PHASE_ONSETS: usize = 32;
/// Beats per bar
pub const BEATS_PER_BAR: usize = 4;

/// Build a regular beat grid spanning `[0, duration)`
///
/// Phase is resolved in priority order: an external high-confidence offset
/// (hybrid sync), then the mean residual of the first onsets against the ideal
/// grid (statistical sync), then zero. `bpm` must be positive.
pub fn lock_grid(onsets: &[f64], bpm: f64, duration: f64, external_offset: Option<f64>) -> BeatGrid {
    debug_assert!(bpm > 0.0, "lock_grid requires a positive tempo");
    let interval = 60.0 / bpm;

    let raw_phase = match external_offset {
        Some(offset) => {
            log::debug!("Grid phase from external offset: {:.4}s", offset);
            offset
        }
        None if onsets.len() >= 2 => {
            let used = onsets.len().min(MAX_PHASE_ONSETS);
            let residual: f64 = onsets[..used]
                .iter()
                .enumerate()
                .map(|(i, &onset)| onset - i as f64 * interval)
                .sum();
            let phase = residual / used as f64;
            log::debug!("Grid phase from {} onsets: {:.4}s", used, phase);
            phase
        }
        None => 0.0,
    };

    let phase = normalize_phase(raw_phase, interval);

    let count = if duration > phase {
        ((duration - phase) / interval).floor() as usize
    } else {
        0
    };

    let beats: Vec<f64> = (0..count)
        .map(|k| phase + k as f64 * interval)
        .filter(|&t| t < duration)
        .collect();
    let downbeats = beats.iter().step_by(BEATS_PER_BAR).copied().collect();

    BeatGrid {
        bpm,
        offset_ms: phase * 1000.0,
        beats,
        downbeats,
    }
}

/// Fold a phase into `[0, interval)`
fn normalize_phase(phase: f64, interval: f64) -> f64 {
    if !phase.is_finite() {
        return 0.0;
    }
    let mut p = phase.rem_euclid(interval);
    // rem_euclid can round up to exactly `interval` for tiny negative inputs
    if p >= interval {
        p -= interval;
    }
    p.max(0.0)
}

/// Nearest value in a sorted list of times
pub fn nearest(times: &[f64], target: f64) -> Option<f64> {
    times
        .iter()
        .copied()
        .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_evidence_grid() {
        let grid = lock_grid(&[], 125.0, 40.0, None);
        assert_eq!(grid.offset_ms, 0.0);
        assert_eq!(grid.beats.len(), 83);
        assert_eq!(grid.downbeats.len(), 21);
    }

    #[test]
    fn test_grid_totality() {
        for &(bpm, duration) in &[(60.0, 10.0), (127.3, 183.7), (174.0, 5.5), (90.0, 300.0)] {
            let grid = lock_grid(&[0.13, 0.61, 1.07], bpm, duration, None);
            let interval = 60.0 / bpm;
            assert!(grid.beats[0] >= 0.0);
            assert!(*grid.beats.last().unwrap() < duration);
            for pair in grid.beats.windows(2) {
                assert!(pair[1] > pair[0]);
                assert!((pair[1] - pair[0] - interval).abs() < 1e-6);
            }
            let expected: Vec<f64> = grid.beats.iter().step_by(4).copied().collect();
            assert_eq!(grid.downbeats, expected);
        }
    }

    #[test]
    fn test_phase_normalization() {
        for &offset in &[-7.3, -0.0001, 0.0, 0.2, 0.48, 13.37, 1e6] {
            let grid = lock_grid(&[], 125.0, 60.0, Some(offset));
            let phase = grid.offset_ms / 1000.0;
            assert!(phase >= 0.0 && phase < 0.48, "offset {} -> phase {}", offset, phase);
        }
    }

    #[test]
    fn test_external_offset_wins_over_onsets() {
        let grid = lock_grid(&[0.3, 0.78], 125.0, 10.0, Some(0.1));
        assert!((grid.beats[0] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_statistical_sync() {
        let interval = 60.0 / 120.0;
        let onsets: Vec<f64> = (0..40).map(|i| 0.2 + i as f64 * interval).collect();
        let grid = lock_grid(&onsets, 120.0, 30.0, None);
        assert!((grid.offset_ms - 200.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_onset_means_zero_phase() {
        let grid = lock_grid(&[0.3], 120.0, 30.0, None);
        assert_eq!(grid.offset_ms, 0.0);
    }

    #[test]
    fn test_nearest() {
        assert_eq!(nearest(&[0.0, 2.0, 4.0], 2.9), Some(2.0));
        assert_eq!(nearest(&[], 1.0), None);
    }
}
