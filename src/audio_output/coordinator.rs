// coordinator.rs - Mixer/output coordinator

//! Process-wide pipeline state.
//!
//! The coordinator owns the single admission slot together with the output
//! device and mixer created for the admitted stream. The output and the mixer
//! exist only while a stream is admitted. All of it sits behind the
//! coordinator lock, the outermost lock tier.

use std::sync::Arc;

use crate::audio_output::input::InputStream;
use crate::audio_output::lock_order::{LockRank, RankedGuard, RankedMutex};
use crate::audio_output::mixer::{AudioMixer, MixerFactory, SoftwareMixerFactory};
use crate::audio_output::output::{AudioOutput, NullOutputFactory, OutputFactory};
use crate::audio_output::types::ChannelMode;
use crate::config::{parse_volume, PipelineConfig};

/// Dynamic per-output parameters
///
/// Reset whenever a stream is admitted or removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputVars {
    pub device: Option<String>,
    pub channels: Option<ChannelMode>,
}

impl OutputVars {
    pub fn clear(&mut self) {
        self.device = None;
        self.channels = None;
    }
}

pub(crate) struct CoordinatorState {
    pub(crate) input: Option<Arc<InputStream>>,
    pub(crate) output: Option<Box<dyn AudioOutput>>,
    pub(crate) mixer: Option<Box<dyn AudioMixer>>,
    pub(crate) vars: OutputVars,
    pub(crate) config: PipelineConfig,
}

impl CoordinatorState {
    /// Drain the admitted stream into the output
    ///
    /// Errors from the mixer are logged and swallowed; the decoder only
    /// hears about failures of its own submission.
    pub(crate) fn run_mixer(&mut self) -> usize {
        let (Some(input), Some(output), Some(mixer)) =
            (self.input.as_ref(), self.output.as_mut(), self.mixer.as_mut())
        else {
            return 0;
        };

        match mixer.run(input, output.as_mut(), self.config.volume) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("mixer run failed on {}: {}", output.name(), e);
                0
            }
        }
    }

    /// Drop the output and mixer and forget per-output parameters
    pub(crate) fn release_output(&mut self) {
        if let Some(mut output) = self.output.take() {
            output.flush();
            log::debug!("closing output {}", output.name());
        }
        self.mixer = None;
        self.vars.clear();
    }
}

/// Owner of the admission slot, output and mixer
pub struct Coordinator {
    state: RankedMutex<CoordinatorState>,
    pub(crate) outputs: Arc<dyn OutputFactory>,
    pub(crate) mixers: Arc<dyn MixerFactory>,
}

impl Coordinator {
    pub fn new(
        config: PipelineConfig,
        outputs: Arc<dyn OutputFactory>,
        mixers: Arc<dyn MixerFactory>,
    ) -> Self {
        Coordinator {
            state: RankedMutex::new(
                LockRank::Coordinator,
                CoordinatorState {
                    input: None,
                    output: None,
                    mixer: None,
                    vars: OutputVars::default(),
                    config,
                },
            ),
            outputs,
            mixers,
        }
    }

    /// Coordinator with a null output and the software mixer
    pub fn with_null_output(config: PipelineConfig) -> (Self, NullOutputFactory) {
        let outputs = NullOutputFactory::new();
        let coordinator = Coordinator::new(
            config,
            Arc::new(outputs.clone()),
            Arc::new(SoftwareMixerFactory::new()),
        );
        (coordinator, outputs)
    }

    pub(crate) fn lock(&self) -> RankedGuard<'_, CoordinatorState> {
        self.state.lock()
    }

    pub fn is_admitted(&self) -> bool {
        self.lock().input.is_some()
    }

    pub fn has_output(&self) -> bool {
        self.lock().output.is_some()
    }

    pub fn has_mixer(&self) -> bool {
        self.lock().mixer.is_some()
    }

    pub fn config(&self) -> PipelineConfig {
        self.lock().config.clone()
    }

    /// Replace the configuration
    ///
    /// Replay gain and timestamp tolerances take effect on the next restart
    /// of the admitted stream, volume on the next mixer run.
    pub fn set_config(&self, mut config: PipelineConfig) {
        config.volume = parse_volume(config.volume);
        self.lock().config = config;
    }

    pub fn volume(&self) -> f32 {
        self.lock().config.volume
    }

    pub fn set_volume(&self, volume: f32) {
        self.lock().config.volume = parse_volume(volume);
    }

    /// Drain the admitted stream into the output
    ///
    /// Returns the number of buffers delivered.
    pub fn run_mixer(&self) -> usize {
        self.lock().run_mixer()
    }

    pub fn select_device(&self, name: &str) {
        self.lock().vars.device = Some(name.to_string());
    }

    pub fn select_channels(&self, mode: ChannelMode) {
        self.lock().vars.channels = Some(mode);
    }

    pub fn device_selection(&self) -> OutputVars {
        self.lock().vars.clone()
    }
}
