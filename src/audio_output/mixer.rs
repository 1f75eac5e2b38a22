// mixer.rs - Software mixer

//! Drains an input stream's FIFO into the output device.
//!
//! The mixer is invoked by the coordinator after each successful submit and
//! whenever it is asked to run explicitly. It does nothing while the stream
//! is paused. Otherwise every queued buffer is taken in FIFO order, scaled by
//! the volume and the stream's replay-gain multiplier, and handed to the
//! output.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::audio_output::error::{AoutError, Result};
use crate::audio_output::format::AudioFormat;
use crate::audio_output::input::InputStream;
use crate::audio_output::output::AudioOutput;
use crate::audio_output::types::SampleFormat;

/// Moves samples from an input stream to an output
pub trait AudioMixer: Send {
    /// Drain whatever the stream has queued into `output`
    ///
    /// Returns the number of buffers delivered. Takes the stream lock and
    /// then the FIFO lock, so the caller may hold the coordinator lock but
    /// nothing below it.
    fn run(
        &mut self,
        input: &InputStream,
        output: &mut dyn AudioOutput,
        volume: f32,
    ) -> Result<usize>;
}

/// Creates mixers for admitted streams
pub trait MixerFactory: Send + Sync {
    fn create_mixer(&self, format: &AudioFormat) -> Result<Box<dyn AudioMixer>>;
}

/// Mixer that applies a scalar gain to every sample
pub struct SoftwareMixer {
    format: AudioFormat,
}

impl SoftwareMixer {
    pub fn new(format: AudioFormat) -> Self {
        SoftwareMixer { format }
    }
}

impl AudioMixer for SoftwareMixer {
    fn run(
        &mut self,
        input: &InputStream,
        output: &mut dyn AudioOutput,
        volume: f32,
    ) -> Result<usize> {
        let gain = {
            let state = input.lock_state();
            if state.is_paused() || !state.status().is_active() {
                return Ok(0);
            }
            volume * state.multiplier()
        };

        let buffers = input.lock_fifo().drain();
        let mut delivered = 0;
        for mut buffer in buffers {
            apply_gain(self.format.sample_format, buffer.data_mut(), gain);
            output.play(buffer)?;
            delivered += 1;
        }

        Ok(delivered)
    }
}

/// Scale interleaved samples in place
pub fn apply_gain(format: SampleFormat, data: &mut [u8], gain: f32) {
    if gain == 1.0 {
        return;
    }

    match format {
        SampleFormat::U8 => {
            for sample in data.iter_mut() {
                let centered = (*sample as f32 - 128.0) * gain;
                *sample = (centered.round() + 128.0).clamp(0.0, 255.0) as u8;
            }
        }
        SampleFormat::S16 => {
            for chunk in data.chunks_exact_mut(2) {
                let v = i16::from_ne_bytes([chunk[0], chunk[1]]) as f32 * gain;
                let v = v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
        }
        SampleFormat::S32 => {
            for chunk in data.chunks_exact_mut(4) {
                let v = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64
                    * gain as f64;
                let v = v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32;
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
        }
        SampleFormat::F32 => {
            for chunk in data.chunks_exact_mut(4) {
                let v = f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) * gain;
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
        }
        SampleFormat::F64 => {
            for chunk in data.chunks_exact_mut(8) {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                let v = f64::from_ne_bytes(raw) * gain as f64;
                chunk.copy_from_slice(&v.to_ne_bytes());
            }
        }
    }
}

/// Factory for [`SoftwareMixer`]s
///
/// Like the null output factory it can be told to fail.
#[derive(Clone, Default)]
pub struct SoftwareMixerFactory {
    fail: Arc<Mutex<bool>>,
    created: Arc<Mutex<usize>>,
}

impl SoftwareMixerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let factory = Self::default();
        factory.set_failing(true);
        factory
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Mixers handed out so far
    pub fn created(&self) -> usize {
        *self.created.lock()
    }
}

impl MixerFactory for SoftwareMixerFactory {
    fn create_mixer(&self, format: &AudioFormat) -> Result<Box<dyn AudioMixer>> {
        if *self.fail.lock() {
            return Err(AoutError::MixerFailure(format!(
                "no mixer for {:?} samples",
                format.sample_format
            )));
        }
        *self.created.lock() += 1;
        Ok(Box::new(SoftwareMixer::new(format.clone())))
    }
}
