// Biquad filters (RBJ audio EQ cookbook), transposed direct form II.
//
// Covers the shapes a channel strip needs: shelves for the EQ, a peaking
// band, and the sweepable lowpass/highpass.

use std::f64::consts::PI;

/// Filter shape and its shape-specific parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BiquadKind {
    LowShelf { gain_db: f64 },
    HighShelf { gain_db: f64 },
    Peaking { gain_db: f64, q: f64 },
    Lowpass { q: f64 },
    Highpass { q: f64 },
}

/// Single-channel biquad section.
#[derive(Debug, Clone)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    // Filter state
    z1: f64,
    z2: f64,
}

impl Biquad {
    pub fn new(kind: BiquadKind, freq: f64, sample_rate: f64) -> Self {
        let mut filter = Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.set(kind, freq, sample_rate);
        filter
    }

    pub fn lowpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        Self::new(BiquadKind::Lowpass { q }, freq, sample_rate)
    }

    pub fn highpass(freq: f64, q: f64, sample_rate: f64) -> Self {
        Self::new(BiquadKind::Highpass { q }, freq, sample_rate)
    }

    /// Recompute coefficients, keeping the filter state.
    pub fn set(&mut self, kind: BiquadKind, freq: f64, sample_rate: f64) {
        // Clamp cutoff to valid range
        let freq = freq.clamp(10.0, sample_rate * 0.49);
        let w0 = 2.0 * PI * freq / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();

        let (b0, b1, b2, a0, a1, a2) = match kind {
            BiquadKind::Lowpass { q } => {
                let alpha = sin_w0 / (2.0 * q.max(0.0001));
                (
                    (1.0 - cos_w0) / 2.0,
                    1.0 - cos_w0,
                    (1.0 - cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            BiquadKind::Highpass { q } => {
                let alpha = sin_w0 / (2.0 * q.max(0.0001));
                (
                    (1.0 + cos_w0) / 2.0,
                    -(1.0 + cos_w0),
                    (1.0 + cos_w0) / 2.0,
                    1.0 + alpha,
                    -2.0 * cos_w0,
                    1.0 - alpha,
                )
            }
            BiquadKind::Peaking { gain_db, q } => {
                let a = 10f64.powf(gain_db / 40.0);
                let alpha = sin_w0 / (2.0 * q.max(0.0001));
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
            BiquadKind::LowShelf { gain_db } => {
                let a = 10f64.powf(gain_db / 40.0);
                // Shelf slope S = 1
                let alpha = sin_w0 / 2.0 * 2f64.sqrt();
                let sqrt_a = a.sqrt();
                (
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a * ((a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha),
                    (a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    (a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha,
                )
            }
            BiquadKind::HighShelf { gain_db } => {
                let a = 10f64.powf(gain_db / 40.0);
                let alpha = sin_w0 / 2.0 * 2f64.sqrt();
                let sqrt_a = a.sqrt();
                (
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a * ((a + 1.0) + (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha),
                    (a + 1.0) - (a - 1.0) * cos_w0 + 2.0 * sqrt_a * alpha,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    (a + 1.0) - (a - 1.0) * cos_w0 - 2.0 * sqrt_a * alpha,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let x = input as f64;
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y as f32
    }

    pub fn process_in_place(&mut self, samples: &mut [f32]) {
        for s in samples.iter_mut() {
            *s = self.process_sample(*s);
        }
    }
}
