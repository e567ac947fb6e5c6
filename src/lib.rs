use nih_plug::prelude::*;
use std::sync::Arc;

pub mod biquad;
pub mod bridge;
pub mod coefficients;
mod editor;
pub mod params;
pub mod processor;

use bridge::ParameterBridge;
use coefficients::ParameterSnapshot;
use params::IirFilterParams;
use processor::BlockProcessor;

/// Placeholder rate until the host calls `initialize`.
const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Resonant 12 dB/oct lowpass.
///
/// Parameter changes reach the [`ParameterBridge`] through the parameter callbacks on whatever
/// thread the host uses. `process` only ever reads the published coefficients.
pub struct IirFilter {
    params: Arc<IirFilterParams>,
    processor: BlockProcessor,

    /// Main input channel count of the negotiated layout. Output channels past this are silenced.
    input_channels: usize,
}

impl Default for IirFilter {
    fn default() -> Self {
        let bridge = Arc::new(ParameterBridge::new(
            ParameterSnapshot::default(),
            DEFAULT_SAMPLE_RATE,
        ));

        Self {
            params: Arc::new(IirFilterParams::new(bridge.clone())),
            processor: BlockProcessor::new(bridge),

            input_channels: 2,
        }
    }
}

impl Plugin for IirFilter {
    const NAME: &'static str = "IIR Lowpass";
    const VENDOR: &'static str = "Kakeru3";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";

    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            ..AudioIOLayout::const_default()
        },
        // モノラル入力 → ステレオ出力 (右チャンネルは無音)
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(2),
            ..AudioIOLayout::const_default()
        },
    ];

    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn editor(&mut self, _async_executor: AsyncExecutor<Self>) -> Option<Box<dyn Editor>> {
        editor::create(self.params.clone(), self.params.editor_state.clone())
    }

    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.input_channels = audio_io_layout
            .main_input_channels
            .map(NonZeroU32::get)
            .unwrap_or(0) as usize;

        // 保存状態の復元直後でも、ホスト側の現在値から係数を作り直す
        self.processor.bridge().set_snapshot(self.params.snapshot());

        match self.processor.prepare(
            buffer_config.sample_rate,
            buffer_config.max_buffer_size as usize,
        ) {
            Ok(()) => true,
            Err(err) => {
                nih_error!("could not prepare the filter: {}", err);
                false
            }
        }
    }

    fn reset(&mut self) {
        self.processor.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.processor.process_block(buffer.as_slice(), self.input_channels);

        ProcessStatus::Normal
    }
}

impl ClapPlugin for IirFilter {
    const CLAP_ID: &'static str = "com.kakeru3.iir-lowpass";
    const CLAP_DESCRIPTION: Option<&'static str> = Some("Resonant biquad lowpass filter");
    const CLAP_MANUAL_URL: Option<&'static str> = Some(Self::URL);
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Filter,
        ClapFeature::Stereo,
        ClapFeature::Mono,
    ];
}

impl Vst3Plugin for IirFilter {
    const VST3_CLASS_ID: [u8; 16] = *b"IirLowpassKakeru";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Filter];
}

nih_export_clap!(IirFilter);
nih_export_vst3!(IirFilter);
