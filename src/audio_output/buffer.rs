// buffer.rs - Audio buffer allocation

//! Audio buffers exchanged between decoder, input stream and mixer.
//!
//! A buffer is owned by exactly one stage at a time: the decoder while it
//! fills it, the input stream while it sits in the pending FIFO, and the
//! mixer while it drains it to the output. Ownership moves by value, so a
//! buffer handed to `submit` can never be touched by the decoder again.

use crate::audio_output::error::{AoutError, Result};
use crate::audio_output::format::AudioFormat;
use crate::audio_output::types::*;

/// A block of interleaved PCM samples with its presentation time
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Raw sample bytes
    data: Vec<u8>,
    /// Number of samples (frames) held in `data`
    pub nb_samples: usize,
    /// Presentation timestamp (µs)
    pub pts: Mtime,
    /// Duration (µs), derived from `nb_samples` once `pts` is known
    pub length: Mtime,
}

impl AudioBuffer {
    /// Wrap already-filled sample bytes
    pub fn from_vec(data: Vec<u8>, nb_samples: usize) -> Self {
        AudioBuffer {
            data,
            nb_samples,
            pts: 0,
            length: 0,
        }
    }

    /// Allocate a zeroed buffer of `len` bytes
    pub fn try_alloc(len: usize, nb_samples: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            AoutError::ResourceExhaustion(format!("audio buffer of {} bytes: {}", len, e))
        })?;
        data.resize(len, 0);
        Ok(AudioBuffer::from_vec(data, nb_samples))
    }

    /// Allocate a zeroed buffer of `len` bytes
    ///
    /// Returns `None` when the allocation cannot be satisfied.
    pub fn alloc(len: usize, nb_samples: usize) -> Option<Self> {
        match AudioBuffer::try_alloc(len, nb_samples) {
            Ok(buffer) => Some(buffer),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    /// Allocate a buffer for `nb_samples` samples of `format`
    ///
    /// Returns `None` when the byte size overflows or allocation fails.
    pub fn for_format(format: &AudioFormat, nb_samples: usize) -> Option<Self> {
        let Some(len) = format.bytes_for(nb_samples) else {
            log::warn!("audio buffer of {} samples is too large", nb_samples);
            return None;
        };
        AudioBuffer::alloc(len, nb_samples)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// End of the buffer on the presentation timeline
    pub fn end(&self) -> Mtime {
        self.pts.saturating_add(self.length)
    }

    /// Compute `length` from the sample count and a sample rate
    ///
    /// Returns the new length, or `None` (length left untouched) when the
    /// sample count is too large to express in microseconds.
    pub fn compute_length(&mut self, rate: u32) -> Option<Mtime> {
        let length = samples_duration(self.nb_samples, rate)?;
        self.length = length;
        Some(length)
    }
}
