// format.rs - Stream format description and validation

//! Stream format validation and normalization.
//!
//! A decoder describes its output with an [`AudioFormat`]. Before any stream
//! resource exists the format goes through [`AudioFormat::validate`]; only an
//! accepted format is then normalized by [`AudioFormat::prepare`].

use crate::audio_output::error::{AoutError, Result};
use crate::audio_output::types::*;

/// Negotiated stream format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample encoding
    pub sample_format: SampleFormat,
    /// Sample rate in Hz
    pub rate: u32,
    /// Physical channel layout
    pub channel_mask: ChannelMask,
    /// Declared channel count, must agree with `channel_mask`
    pub channels: u32,
    /// Bytes in one frame (filled in by `prepare`)
    pub bytes_per_frame: u32,
    /// Samples per frame (filled in by `prepare`)
    pub frame_length: u32,
    /// Bits per sample (filled in by `prepare`)
    pub bits_per_sample: u32,
}

impl AudioFormat {
    /// Create a format whose channel count follows the mask
    pub fn new(sample_format: SampleFormat, rate: u32, channel_mask: ChannelMask) -> Self {
        AudioFormat {
            sample_format,
            rate,
            channel_mask,
            channels: channel_mask.count(),
            bytes_per_frame: 0,
            frame_length: 0,
            bits_per_sample: 0,
        }
    }

    /// Signed 16-bit stereo at `rate`
    pub fn stereo_s16(rate: u32) -> Self {
        Self::new(SampleFormat::S16, rate, ChannelMask::STEREO)
    }

    /// Float stereo at `rate`
    pub fn stereo_f32(rate: u32) -> Self {
        Self::new(SampleFormat::F32, rate, ChannelMask::STEREO)
    }

    /// Check the channel count, the layout mask and the sample rate
    ///
    /// Never modifies the format.
    pub fn validate(&self) -> Result<()> {
        if self.channels > AOUT_CHAN_MAX {
            return Err(AoutError::InvalidFormat(format!(
                "too many audio channels ({})",
                self.channels
            )));
        }
        if self.channels == 0 {
            return Err(AoutError::InvalidFormat("no audio channels".into()));
        }
        if self.channels != self.channel_mask.count() {
            return Err(AoutError::InvalidFormat(format!(
                "incompatible audio channels count with layout mask ({} vs {})",
                self.channels,
                self.channel_mask.count()
            )));
        }
        if self.rate > AOUT_MAX_RATE {
            return Err(AoutError::InvalidFormat(format!(
                "excessive audio sample frequency ({})",
                self.rate
            )));
        }
        if self.rate < AOUT_MIN_RATE {
            return Err(AoutError::InvalidFormat(format!(
                "too low audio sample frequency ({})",
                self.rate
            )));
        }
        Ok(())
    }

    /// Derive frame geometry from the channel count and sample size
    pub fn prepare(&mut self) {
        self.bits_per_sample = self.sample_format.bits_per_sample();
        self.bytes_per_frame = self.sample_format.bytes_per_sample() * self.channels;
        self.frame_length = 1;
    }

    /// Validate, then normalize in place
    ///
    /// A rejected format is left exactly as it was.
    pub fn sanitize(&mut self) -> Result<()> {
        self.validate()?;
        self.prepare();
        Ok(())
    }

    /// Whether `prepare` has filled in the frame geometry
    pub fn is_prepared(&self) -> bool {
        self.bytes_per_frame != 0 && self.frame_length != 0
    }

    /// Byte length of `nb_samples` samples in this format
    ///
    /// `None` when the size does not fit in `usize`.
    pub fn bytes_for(&self, nb_samples: usize) -> Option<usize> {
        if self.frame_length == 0 {
            return Some(0);
        }
        nb_samples
            .checked_mul(self.bytes_per_frame as usize)
            .map(|bytes| bytes / self.frame_length as usize)
    }

    /// Duration of `nb_samples` samples in microseconds
    ///
    /// `None` when the duration does not fit in an `Mtime`.
    pub fn duration_of(&self, nb_samples: usize) -> Option<Mtime> {
        samples_duration(nb_samples, self.rate)
    }
}
