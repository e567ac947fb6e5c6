//! RBJ cookbook lowpass coefficients.
//!
//! The coefficient set is kept un-normalized (`a0` is stored alongside the other five values) and
//! the difference equation divides by `a0` at run time, see [`crate::biquad::ChannelState`].

use std::f64::consts::PI;

/// Q value that gives a maximally flat (Butterworth) response.
pub const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// The two user-facing control values the coefficients are derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub cutoff_hz: f32,
    pub q: f32,
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            cutoff_hz: 1000.0,
            q: 0.707,
        }
    }
}

/// A complete biquad coefficient set. Replaced as a whole, never patched field by field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterCoefficients {
    pub a0: f32,
    pub a1: f32,
    pub a2: f32,
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
}

impl FilterCoefficients {
    /// A pass-through set, used before anything has been computed.
    pub const IDENTITY: Self = Self {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    };

    /// Computes a lowpass biquad for `cutoff_hz` and `q` at `sample_rate`.
    ///
    /// Callers must keep `0 < cutoff_hz < sample_rate / 2` and `q > 0`. Nothing is clamped here.
    /// The trigonometry runs in `f64` so that low cutoffs at high sample rates don't lose the
    /// small `1 - cos(w)` terms.
    pub fn lowpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        let omega = 2.0 * PI * cutoff_hz as f64 / sample_rate as f64;
        let cos_w = omega.cos();
        let sin_w = omega.sin();
        let alpha = sin_w / (2.0 * q as f64);

        let b1 = 1.0 - cos_w;
        let b0 = b1 / 2.0;

        Self {
            a0: (1.0 + alpha) as f32,
            a1: (-2.0 * cos_w) as f32,
            a2: (1.0 - alpha) as f32,
            b0: b0 as f32,
            b1: b1 as f32,
            b2: b0 as f32,
        }
    }

    /// `[a0, a1, a2, b0, b1, b2]`, the layout used by the published slot.
    pub fn to_array(self) -> [f32; 6] {
        [self.a0, self.a1, self.a2, self.b0, self.b1, self.b2]
    }

    pub fn from_array([a0, a1, a2, b0, b1, b2]: [f32; 6]) -> Self {
        Self {
            a0,
            a1,
            a2,
            b0,
            b1,
            b2,
        }
    }

    /// Magnitude response at `freq_hz`, evaluated on the unit circle.
    pub fn magnitude_at(&self, freq_hz: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * freq_hz as f64 / sample_rate as f64;
        let (cos1, sin1) = (w.cos(), w.sin());
        let (cos2, sin2) = ((2.0 * w).cos(), (2.0 * w).sin());

        let num_re = self.b0 as f64 + self.b1 as f64 * cos1 + self.b2 as f64 * cos2;
        let num_im = -(self.b1 as f64 * sin1 + self.b2 as f64 * sin2);
        let den_re = self.a0 as f64 + self.a1 as f64 * cos1 + self.a2 as f64 * cos2;
        let den_im = -(self.a1 as f64 * sin1 + self.a2 as f64 * sin2);

        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt() as f32
    }

    /// Largest pole modulus of the normalized denominator `z^2 + (a1/a0) z + a2/a0`.
    pub fn pole_radius(&self) -> f32 {
        let a1 = self.a1 as f64 / self.a0 as f64;
        let a2 = self.a2 as f64 / self.a0 as f64;
        let disc = a1 * a1 - 4.0 * a2;

        if disc < 0.0 {
            // Complex conjugate pair, |p|^2 = a2
            a2.sqrt() as f32
        } else {
            let root = disc.sqrt();
            let p1 = (-a1 + root) / 2.0;
            let p2 = (-a1 - root) / 2.0;
            p1.abs().max(p2.abs()) as f32
        }
    }
}

/// `compute(cutoff, Q, fs)`: the free-function form of [`FilterCoefficients::lowpass`].
pub fn compute(snapshot: ParameterSnapshot, sample_rate: f32) -> FilterCoefficients {
    FilterCoefficients::lowpass(snapshot.cutoff_hz, snapshot.q, sample_rate)
}
