use nih_plug::prelude::*;
use nih_plug_iced::IcedState;
use std::sync::Arc;

use crate::bridge::{FilterParam, ParameterBridge};
use crate::coefficients::ParameterSnapshot;

pub const CUTOFF_MIN_HZ: f32 = 50.0;
pub const CUTOFF_MAX_HZ: f32 = 20000.0;
pub const Q_MIN: f32 = 0.1;
pub const Q_MAX: f32 = 20.0;

/// Host-facing parameters. nih_plug persists the raw values (and the editor size); coefficients
/// are always re-derived from them in `initialize`.
#[derive(Params)]
pub struct IirFilterParams {
    #[persist = "editor-state"]
    pub editor_state: Arc<IcedState>,

    #[id = "cutoff"]
    pub cutoff: FloatParam,

    #[id = "q"]
    pub q: FloatParam,
}

impl IirFilterParams {
    /// Every value change is forwarded to `bridge`, which republishes the coefficients before the
    /// callback returns.
    pub fn new(bridge: Arc<ParameterBridge>) -> Self {
        let defaults = ParameterSnapshot::default();

        Self {
            editor_state: crate::editor::default_state(),

            cutoff: FloatParam::new(
                "Freq",
                defaults.cutoff_hz,
                FloatRange::Skewed {
                    min: CUTOFF_MIN_HZ,
                    max: CUTOFF_MAX_HZ,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_step_size(1.0)
            .with_unit(" Hz")
            .with_value_to_string(formatters::v2s_f32_rounded(0))
            .with_callback(param_callback(bridge.clone(), FilterParam::Cutoff)),

            q: FloatParam::new(
                "Q",
                defaults.q,
                FloatRange::Skewed {
                    min: Q_MIN,
                    max: Q_MAX,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_step_size(0.01)
            .with_value_to_string(formatters::v2s_f32_rounded(2))
            .with_callback(param_callback(bridge, FilterParam::Q)),
        }
    }

    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            cutoff_hz: self.cutoff.value(),
            q: self.q.value(),
        }
    }
}

fn param_callback(
    bridge: Arc<ParameterBridge>,
    param: FilterParam,
) -> Arc<dyn Fn(f32) + Send + Sync> {
    Arc::new(move |value| bridge.on_parameter_changed(param, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_snapshot_defaults() {
        let bridge = Arc::new(ParameterBridge::new(ParameterSnapshot::default(), 44100.0));
        let params = IirFilterParams::new(bridge);

        assert_eq!(params.snapshot(), ParameterSnapshot::default());
    }

    #[test]
    fn ranges_cover_the_declared_limits() {
        let bridge = Arc::new(ParameterBridge::new(ParameterSnapshot::default(), 44100.0));
        let params = IirFilterParams::new(bridge);

        assert!((params.cutoff.preview_plain(0.0) - CUTOFF_MIN_HZ).abs() < 1e-3);
        assert!((params.cutoff.preview_plain(1.0) - CUTOFF_MAX_HZ).abs() < 1e-3);
        assert!((params.q.preview_plain(0.0) - Q_MIN).abs() < 1e-5);
        assert!((params.q.preview_plain(1.0) - Q_MAX).abs() < 1e-5);
    }
}
