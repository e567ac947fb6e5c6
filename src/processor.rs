use nih_plug::prelude::*;
use std::sync::Arc;
use thiserror::Error;

use crate::biquad::ChannelState;
use crate::bridge::{ParameterBridge, MAX_CUTOFF_RATIO};
use crate::coefficients::FilterCoefficients;
use crate::params::CUTOFF_MAX_HZ;

/// ステレオまで
pub const MAX_CHANNELS: usize = 2;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PrepareError {
    #[error("sample rate must be a positive, finite number of Hz (got {0})")]
    InvalidSampleRate(f32),
    #[error("maximum block size must be at least one sample")]
    InvalidBlockSize,
}

/// The audio-rate half of the filter.
///
/// Owns the per-channel history and a copy of the coefficient set that is refreshed from the
/// [`ParameterBridge`] once at the top of every block.
pub struct BlockProcessor {
    bridge: Arc<ParameterBridge>,

    /// The set used for the current block. Kept when the bridge can't hand out a fresh one.
    coefficients: FilterCoefficients,
    channels: [ChannelState; MAX_CHANNELS],
    /// Channel count of the previous block, so a layout change can clear the history.
    active_channels: usize,

    max_block_size: usize,
}

impl BlockProcessor {
    pub fn new(bridge: Arc<ParameterBridge>) -> Self {
        let coefficients = bridge.try_load().unwrap_or(FilterCoefficients::IDENTITY);

        Self {
            bridge,

            coefficients,
            channels: [ChannelState::new(); MAX_CHANNELS],
            active_channels: 0,

            max_block_size: 0,
        }
    }

    /// `onPrepare`: validates the stream configuration, republishes the coefficients for the new
    /// sample rate and clears all channel history. Must run before the first block.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> Result<(), PrepareError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(PrepareError::InvalidSampleRate(sample_rate));
        }
        if max_block_size == 0 {
            return Err(PrepareError::InvalidBlockSize);
        }

        self.max_block_size = max_block_size;

        // サンプルレートが変わると同じ cutoff/Q でも係数が変わる
        self.bridge.set_sample_rate(sample_rate);
        self.refresh_coefficients();
        self.reset();

        let cutoff_limit = sample_rate * MAX_CUTOFF_RATIO;
        if cutoff_limit < CUTOFF_MAX_HZ {
            nih_warn!(
                "cutoff is limited to {:.0} Hz at a sample rate of {} Hz",
                cutoff_limit,
                sample_rate
            );
        }

        nih_log!(
            "prepared lowpass at {} Hz (max block {}), {:?}",
            sample_rate,
            max_block_size,
            self.bridge.snapshot()
        );

        Ok(())
    }

    /// Clears every channel's history. Calling it twice in a row is the same as calling it once.
    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.reset();
        }
    }

    /// `processBlock`: filters the first `num_active_channels` channels of `buffer` in place and
    /// silences the rest. Bounded, allocation free and infallible.
    pub fn process_block(&mut self, buffer: &mut [&mut [f32]], num_active_channels: usize) {
        // ブロック先頭で一度だけ係数を取り込む (ブロック途中で係数が変わらないように)
        self.refresh_coefficients();
        let coefficients = self.coefficients;

        let active = num_active_channels.min(MAX_CHANNELS).min(buffer.len());
        if active != self.active_channels {
            self.reset();
            self.active_channels = active;
        }

        let max_block_size = self.max_block_size;
        let (active_buffers, silent_buffers) = buffer.split_at_mut(active);
        for (samples, state) in active_buffers.iter_mut().zip(self.channels.iter_mut()) {
            nih_debug_assert!(max_block_size == 0 || samples.len() <= max_block_size);
            state.process_slice(samples, &coefficients);
        }
        for samples in silent_buffers.iter_mut() {
            samples.fill(0.0);
        }
    }

    pub fn coefficients(&self) -> &FilterCoefficients {
        &self.coefficients
    }

    pub fn channel_state(&self, channel: usize) -> Option<&ChannelState> {
        self.channels.get(channel)
    }

    pub fn bridge(&self) -> &Arc<ParameterBridge> {
        &self.bridge
    }

    fn refresh_coefficients(&mut self) {
        if let Some(coefficients) = self.bridge.try_load() {
            self.coefficients = coefficients;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::FilterParam;
    use crate::coefficients::ParameterSnapshot;

    fn processor(sample_rate: f32) -> BlockProcessor {
        let bridge = Arc::new(ParameterBridge::new(ParameterSnapshot::default(), 44100.0));
        let mut processor = BlockProcessor::new(bridge);
        processor.prepare(sample_rate, 512).unwrap();
        processor
    }

    #[test]
    fn prepare_rejects_bad_sample_rates() {
        let bridge = Arc::new(ParameterBridge::new(ParameterSnapshot::default(), 44100.0));
        let mut processor = BlockProcessor::new(bridge);

        for &sr in &[0.0, -44100.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                processor.prepare(sr, 512),
                Err(PrepareError::InvalidSampleRate(_))
            ));
        }
        assert_eq!(
            processor.prepare(48000.0, 0),
            Err(PrepareError::InvalidBlockSize)
        );
        assert_eq!(processor.prepare(48000.0, 256), Ok(()));
    }

    #[test]
    fn prepare_recomputes_for_new_sample_rate() {
        let mut processor = processor(44100.0);
        let at_44k = *processor.coefficients();

        processor.prepare(96000.0, 512).unwrap();
        assert_ne!(*processor.coefficients(), at_44k);
        assert_eq!(
            *processor.coefficients(),
            FilterCoefficients::lowpass(1000.0, 0.707, 96000.0)
        );
    }

    #[test]
    fn prepare_clears_history() {
        let mut processor = processor(48000.0);
        let mut left = [0.5f32; 64];
        let mut right = [0.5f32; 64];
        processor.process_block(&mut [&mut left[..], &mut right[..]], 2);
        assert!(!processor.channel_state(0).unwrap().is_cleared());

        processor.prepare(48000.0, 512).unwrap();
        assert!(processor.channel_state(0).unwrap().is_cleared());
        assert!(processor.channel_state(1).unwrap().is_cleared());
    }

    #[test]
    fn unmatched_output_channels_are_silenced() {
        let mut processor = processor(48000.0);
        let mut left = [1.0f32; 128];
        let mut right = [0.75f32; 128];
        processor.process_block(&mut [&mut left[..], &mut right[..]], 1);

        assert!(right.iter().all(|&s| s == 0.0));
        assert!(left.iter().any(|&s| s != 0.0));
    }

    #[test]
    fn channels_beyond_stereo_are_silenced() {
        let mut processor = processor(48000.0);
        let mut channels = [[1.0f32; 32]; 4];
        let mut slices: Vec<&mut [f32]> = channels.iter_mut().map(|c| &mut c[..]).collect();
        processor.process_block(&mut slices, 4);

        assert!(channels[2].iter().all(|&s| s == 0.0));
        assert!(channels[3].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channel_count_change_resets_history() {
        let mut processor = processor(48000.0);
        let mut left = [1.0f32; 64];
        let mut right = [1.0f32; 64];
        processor.process_block(&mut [&mut left[..], &mut right[..]], 2);

        // Same block again as mono: channel 0 must start from a cold history
        let mut fresh = BlockProcessor::new(processor.bridge().clone());
        fresh.prepare(48000.0, 512).unwrap();
        let mut expected = [1.0f32; 64];
        fresh.process_block(&mut [&mut expected[..]], 1);

        let mut mono = [1.0f32; 64];
        processor.process_block(&mut [&mut mono[..]], 1);
        assert_eq!(mono, expected);
    }

    #[test]
    fn coefficients_are_fetched_once_per_block() {
        let mut processor = processor(48000.0);
        let before = *processor.coefficients();

        processor
            .bridge()
            .on_parameter_changed(FilterParam::Cutoff, 5000.0);
        // Not picked up until the next block starts
        assert_eq!(*processor.coefficients(), before);

        let mut block = [0.0f32; 16];
        processor.process_block(&mut [&mut block[..]], 1);
        assert_eq!(
            *processor.coefficients(),
            FilterCoefficients::lowpass(5000.0, 0.707, 48000.0)
        );
    }

    #[test]
    fn empty_buffer_is_a_no_op() {
        let mut processor = processor(48000.0);
        let mut no_channels: [&mut [f32]; 0] = [];
        processor.process_block(&mut no_channels, 2);

        let mut empty: [f32; 0] = [];
        processor.process_block(&mut [&mut empty[..]], 1);
    }
}
