use crate::coefficients::FilterCoefficients;

/// Per-channel delay line for a direct form I biquad.
///
/// Only the audio thread ever touches this. The coefficients are passed in on every call so that a
/// new set published between two samples is simply picked up by the next one.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl ChannelState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn process(&mut self, x0: f32, c: &FilterCoefficients) -> f32 {
        // y[n] = (b0 x[n] + b1 x[n-1] + b2 x[n-2] - a1 y[n-1] - a2 y[n-2]) / a0
        let y0 = (c.b0 * x0 + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2)
            / c.a0;

        self.x2 = self.x1;
        self.x1 = x0;
        self.y2 = self.y1;
        self.y1 = y0;

        y0
    }

    /// Filters `samples` in place.
    #[inline]
    pub fn process_slice(&mut self, samples: &mut [f32], c: &FilterCoefficients) {
        for sample in samples.iter_mut() {
            *sample = self.process(*sample, c);
        }
    }

    /// 履歴をゼロに戻す (ストリーム開始時やサンプルレート変更時のクリック対策)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_cleared(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coefficients::BUTTERWORTH_Q;

    #[test]
    fn identity_coefficients_pass_input_through() {
        let mut state = ChannelState::new();
        for &x in &[0.5, -0.25, 1.0, 0.0, 0.75] {
            assert_eq!(state.process(x, &FilterCoefficients::IDENTITY), x);
        }
    }

    #[test]
    fn first_sample_after_reset_only_sees_b0() {
        let c = FilterCoefficients::lowpass(1000.0, BUTTERWORTH_Q, 48000.0);
        let mut state = ChannelState::new();

        let y = state.process(1.0, &c);
        assert!((y - c.b0 / c.a0).abs() < 1e-9);
    }

    #[test]
    fn history_shifts_by_one_sample() {
        // Pure one-sample delay: y[n] = x[n-1]
        let delay = FilterCoefficients {
            b0: 0.0,
            b1: 1.0,
            ..FilterCoefficients::IDENTITY
        };
        let mut state = ChannelState::new();

        let out: Vec<f32> = [1.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|&x| state.process(x, &delay))
            .collect();
        assert_eq!(out, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn reset_clears_history_and_is_idempotent() {
        let c = FilterCoefficients::lowpass(500.0, 2.0, 44100.0);
        let mut state = ChannelState::new();
        let mut block = [1.0f32; 64];
        state.process_slice(&mut block, &c);
        assert!(!state.is_cleared());

        state.reset();
        assert!(state.is_cleared());
        let after_first = state;
        state.reset();
        assert_eq!(state, after_first);
    }

    #[test]
    fn impulse_response_decays_without_nan() {
        let c = FilterCoefficients::lowpass(1000.0, 0.707, 44100.0);
        let mut state = ChannelState::new();

        let mut peak_tail = 0.0f32;
        for n in 0..1000 {
            let x = if n == 0 { 1.0 } else { 0.0 };
            let y = state.process(x, &c);
            assert!(y.is_finite(), "sample {n} is not finite");
            if n >= 900 {
                peak_tail = peak_tail.max(y.abs());
            }
        }
        assert!(peak_tail < 1e-6, "impulse response did not decay: {peak_tail}");
    }
}
