// Bus effects: feedback delay and the master limiter.

use super::biquad::Biquad;

// ═══════════════════════════════════════════════════════════════════
// Feedback Delay
// ═══════════════════════════════════════════════════════════════════

/// Wet-only feedback delay with a lowpass inside the loop.
///
/// Each repeat is darker than the last, which keeps long echo tails from
/// building up harsh highs.
pub struct FeedbackDelay {
    feedback: f32,
    buffers: Vec<Vec<f32>>,
    filters: Vec<Biquad>,
    write_pos: usize,
}

impl FeedbackDelay {
    pub fn new(
        delay_seconds: f64,
        feedback: f32,
        damping_hz: f64,
        channels: usize,
        sample_rate: u32,
    ) -> Self {
        let delay_samples = ((delay_seconds * sample_rate as f64).round() as usize).max(1);
        Self {
            feedback,
            buffers: vec![vec![0.0; delay_samples]; channels],
            filters: (0..channels)
                .map(|_| Biquad::lowpass(damping_hz, 0.707, sample_rate as f64))
                .collect(),
            write_pos: 0,
        }
    }

    /// Process planar input in place, replacing it with the wet signal.
    pub fn process(&mut self, channels: &mut [Vec<f32>]) {
        let len = channels.first().map_or(0, Vec::len);
        let delay_len = self.buffers.first().map_or(1, Vec::len);

        for i in 0..len {
            for (ch, samples) in channels.iter_mut().enumerate().take(self.buffers.len()) {
                let delayed = self.buffers[ch][self.write_pos];
                let wet = self.filters[ch].process_sample(delayed);
                self.buffers[ch][self.write_pos] = samples[i] + wet * self.feedback;
                samples[i] = wet;
            }
            self.write_pos = (self.write_pos + 1) % delay_len;
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Limiter
// ═══════════════════════════════════════════════════════════════════

/// Feed-forward peak compressor with a hard knee, linked across channels.
pub struct Limiter {
    threshold_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope_db: f32,
}

impl Limiter {
    pub fn new(threshold_db: f32, ratio: f32, attack: f32, release: f32, sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        Self {
            threshold_db,
            ratio,
            attack_coeff: (-1.0 / (attack * sr)).exp(),
            release_coeff: (-1.0 / (release * sr)).exp(),
            envelope_db: 0.0,
        }
    }

    /// Gain reduction in dB for a given input level
    fn reduction_db(&self, level_db: f32) -> f32 {
        let over = level_db - self.threshold_db;
        if over <= 0.0 {
            0.0
        } else {
            over - over / self.ratio
        }
    }

    pub fn process(&mut self, channels: &mut [Vec<f32>]) {
        let len = channels.first().map_or(0, Vec::len);

        for i in 0..len {
            let peak = channels.iter().map(|ch| ch[i].abs()).fold(0.0f32, f32::max);
            let level_db = 20.0 * peak.max(1e-6).log10();
            let target = self.reduction_db(level_db);

            let coeff = if target > self.envelope_db {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope_db = target + coeff * (self.envelope_db - target);

            let gain = 10f32.powf(-self.envelope_db / 20.0);
            for ch in channels.iter_mut() {
                ch[i] *= gain;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_repeats_impulse() {
        let mut delay = FeedbackDelay::new(0.01, 0.5, 20_000.0, 1, 44100);
        let mut buf = vec![vec![0.0f32; 1000]];
        buf[0][0] = 1.0;
        delay.process(&mut buf);
        // First echo lands 441 samples later, dry signal is not passed
        assert_eq!(buf[0][0], 0.0);
        let first = buf[0][441].abs();
        assert!(first > 0.1);
        let second = buf[0][870..1000]
            .iter()
            .map(|s| s.abs())
            .fold(0.0f32, f32::max);
        assert!(second > 0.0);
        assert!(second < first);
    }

    #[test]
    fn test_limiter_leaves_quiet_signal() {
        let mut limiter = Limiter::new(-2.0, 12.0, 0.003, 0.25, 44100);
        let mut buf = vec![vec![0.1f32; 1000], vec![-0.1f32; 1000]];
        limiter.process(&mut buf);
        assert!((buf[0][999] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_limiter_reduces_loud_signal() {
        let mut limiter = Limiter::new(-2.0, 12.0, 0.003, 0.25, 44100);
        let mut buf = vec![vec![1.5f32; 44100], vec![1.5f32; 44100]];
        limiter.process(&mut buf);
        let out = buf[0][44099];
        // -2 dB threshold is about 0.794; 12:1 keeps the overshoot small
        assert!(out < 0.9, "limited output {}", out);
    }
}
