//! Structural cue point detection
//!
//! Finds where a track should enter the mix (first downbeat), where it should
//! start handing over (the low-end energy drop of the outro), and a four-bar
//! loop ending at the outro.

use super::grid::nearest;
use super::traits::{BeatGrid, CuePoints, EnergyProfile, LoopRegion};
use crate::model::SourceSeconds;

/// Default distance of the outro from the end of the track
const DEFAULT_OUTRO_FROM_END: f64 = 15.0;
/// Default loop length used when there is no energy profile
const DEFAULT_LOOP_FROM_END: f64 = 20.0;
/// Outro is never later than this close to the end
const MIN_OUTRO_TAIL: f64 = 5.0;
/// Fallback loop start distance from the end
const FALLBACK_LOOP_FROM_END: f64 = 30.0;
/// Baseline window for the outro scan, as fractions of the track
const BASELINE_WINDOW: (f64, f64) = (0.2, 0.7);
/// Where the outro scan starts
const OUTRO_SCAN_START: f64 = 0.7;
/// Low-energy drop relative to the baseline that marks the outro
const OUTRO_DROP_RATIO: f32 = 0.6;
/// An outro earlier than this fraction is considered a false positive
const MIN_OUTRO_FRACTION: f64 = 0.6;
/// Replacement outro position for false positives
const OUTRO_OVERRIDE_FRACTION: f64 = 0.9;
/// Four bars
const LOOP_BEATS: f64 = 16.0;
/// Loop start is only snapped when a downbeat is this close
const LOOP_SNAP_WINDOW: f64 = 2.0;
/// Rolling average width used by the outro scan
const ROLLING_WINDOW: usize = 3;

/// Detect cue points for a track of `duration` seconds
pub fn detect_cue_points(
    energy: &EnergyProfile,
    grid: &BeatGrid,
    bpm: f64,
    duration: f64,
) -> CuePoints {
    if energy.is_empty() {
        let end = (duration - DEFAULT_OUTRO_FROM_END).max(0.0);
        return normalize(
            0.0,
            end,
            (duration - DEFAULT_LOOP_FROM_END).max(0.0),
            end,
            duration,
        );
    }

    let start = grid.downbeats.first().copied().unwrap_or(0.0);

    let outro = find_outro(&energy.low, duration);
    let mut end = nearest(&grid.downbeats, outro).unwrap_or(outro);
    end = end.min(duration - MIN_OUTRO_TAIL);
    if end < duration * MIN_OUTRO_FRACTION {
        log::debug!(
            "Outro at {:.1}s is before {:.0}% of the track, using {:.0}%",
            end,
            MIN_OUTRO_FRACTION * 100.0,
            OUTRO_OVERRIDE_FRACTION * 100.0
        );
        end = duration * OUTRO_OVERRIDE_FRACTION;
    }

    let loop_duration = LOOP_BEATS * (60.0 / bpm);
    let mut loop_start = end - loop_duration;
    if let Some(snap) = nearest(&grid.downbeats, loop_start) {
        if (snap - loop_start).abs() <= LOOP_SNAP_WINDOW {
            loop_start = snap;
        }
    }
    if loop_start < start {
        loop_start = (duration - FALLBACK_LOOP_FROM_END).max(0.0);
    }
    let mut loop_end = end;
    if loop_end <= loop_start {
        loop_end = duration;
    }

    normalize(start, end, loop_start, loop_end, duration)
}

/// First point after 70% where the smoothed low band drops under 60% of the
/// mid-track baseline, or `duration - 15` when it never does
fn find_outro(low: &[f32], duration: f64) -> f64 {
    let n = low.len();
    let fallback = duration - DEFAULT_OUTRO_FROM_END;

    let from = (n as f64 * BASELINE_WINDOW.0) as usize;
    let to = ((n as f64 * BASELINE_WINDOW.1) as usize).min(n);
    if to <= from {
        return fallback;
    }
    let baseline = low[from..to].iter().sum::<f32>() / (to - from) as f32;
    let threshold = baseline * OUTRO_DROP_RATIO;

    let scan_start = (n as f64 * OUTRO_SCAN_START) as usize;
    for i in scan_start..n.saturating_sub(ROLLING_WINDOW - 1) {
        let avg = low[i..i + ROLLING_WINDOW].iter().sum::<f32>() / ROLLING_WINDOW as f32;
        if avg < threshold {
            let t = i as f64 / n as f64 * duration;
            log::debug!("Outro energy drop at bucket {} ({:.1}s)", i, t);
            return t;
        }
    }

    fallback
}

/// Clamp into `0 <= start <= loop.start <= loop.end <= end <= duration`
///
/// Only very short tracks (under ~25s) ever need this.
fn normalize(start: f64, end: f64, loop_start: f64, loop_end: f64, duration: f64) -> CuePoints {
    let duration = duration.max(0.0);
    let end = end.clamp(0.0, duration);
    let start = start.clamp(0.0, end);
    let loop_end = loop_end.clamp(start, end);
    let loop_start = loop_start.clamp(start, loop_end);

    CuePoints {
        start: SourceSeconds(start),
        end: SourceSeconds(end),
        loop_region: LoopRegion {
            start: SourceSeconds(loop_start),
            end: SourceSeconds(loop_end),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::grid::lock_grid;

    fn profile_with_drop(drop_at: usize) -> EnergyProfile {
        let low: Vec<f32> = (0..200).map(|i| if i < drop_at { 0.5 } else { 0.05 }).collect();
        EnergyProfile {
            low: low.clone(),
            mid: low.clone(),
            high: low,
        }
    }

    fn assert_ordered(cues: &CuePoints, duration: f64) {
        assert!(cues.start.0 >= 0.0);
        assert!(cues.start.0 <= cues.loop_region.start.0);
        assert!(cues.loop_region.start.0 <= cues.loop_region.end.0);
        assert!(cues.loop_region.end.0 <= cues.end.0);
        assert!(cues.end.0 <= duration);
    }

    #[test]
    fn test_empty_profile_defaults() {
        let cues = detect_cue_points(&EnergyProfile::default(), &BeatGrid::default(), 125.0, 200.0);
        assert_eq!(cues.start.0, 0.0);
        assert_eq!(cues.end.0, 185.0);
        assert_eq!(cues.loop_region.start.0, 180.0);
        assert_eq!(cues.loop_region.end.0, 185.0);
    }

    #[test]
    fn test_outro_found_at_energy_drop() {
        let duration = 240.0;
        let grid = lock_grid(&[], 125.0, duration, Some(0.1));
        // Drop at bucket 170 = 204s
        let cues = detect_cue_points(&profile_with_drop(170), &grid, 125.0, duration);
        assert!((cues.start.0 - 0.1).abs() < 1e-9);
        assert!((cues.end.0 - 204.0).abs() < 1.0);
        assert!(grid.downbeats.iter().any(|&d| (d - cues.end.0).abs() < 1e-9));
        // Four bars at 125 BPM
        let loop_len = cues.loop_region.end.0 - cues.loop_region.start.0;
        assert!((loop_len - 7.68).abs() < 1e-6);
        assert_ordered(&cues, duration);
        assert!(cues.start.0 < cues.loop_region.start.0);
    }

    #[test]
    fn test_no_drop_uses_default_outro() {
        let duration = 300.0;
        let grid = lock_grid(&[], 125.0, duration, None);
        let cues = detect_cue_points(&profile_with_drop(200), &grid, 125.0, duration);
        // 285s snapped to the nearest downbeat (bars are 1.92s)
        assert!((cues.end.0 - 285.0).abs() <= 0.96);
        assert_ordered(&cues, duration);
    }

    #[test]
    fn test_outro_clamped_near_end() {
        let duration = 240.0;
        let grid = lock_grid(&[], 125.0, duration, None);
        // Drop in the last buckets
        let cues = detect_cue_points(&profile_with_drop(198), &grid, 125.0, duration);
        assert!(cues.end.0 <= duration - 5.0);
        assert_ordered(&cues, duration);
    }

    #[test]
    fn test_short_track_is_implementation_defined_but_ordered() {
        // The default outro lands under 60% of these, so it moves to 90%
        for &duration in &[8.0, 12.0, 20.0, 24.0] {
            let grid = lock_grid(&[], 125.0, duration, None);
            let cues = detect_cue_points(&profile_with_drop(200), &grid, 125.0, duration);
            assert!((cues.end.0 - duration * 0.9).abs() < 1e-9);
            assert_ordered(&cues, duration);
        }
    }
}
