// fifo.rs - Pending buffer queue

//! Ordered queue of buffers waiting for the mixer.
//!
//! The FIFO also keeps the running end date of what it has accepted so the
//! input stage can line the next buffer up against it.

use std::collections::VecDeque;

use crate::audio_output::buffer::AudioBuffer;
use crate::audio_output::types::Mtime;

#[derive(Debug, Default)]
pub struct AudioFifo {
    buffers: VecDeque<AudioBuffer>,
    /// End of the last pushed buffer, `None` when the timeline is unset
    end_date: Option<Mtime>,
}

impl AudioFifo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer and advance the end date past it
    pub fn push(&mut self, buffer: AudioBuffer) {
        self.end_date = Some(buffer.end());
        self.buffers.push_back(buffer);
    }

    /// Remove every queued buffer, oldest first
    pub fn drain(&mut self) -> Vec<AudioBuffer> {
        self.buffers.drain(..).collect()
    }

    /// Discard all queued buffers and reset the timeline to `date`
    ///
    /// A `date` of 0 leaves the timeline unset so the next buffer starts it.
    pub fn set(&mut self, date: Mtime) {
        self.buffers.clear();
        self.end_date = if date == 0 { None } else { Some(date) };
    }

    /// Where the next buffer is expected to start
    pub fn next_start(&self) -> Option<Mtime> {
        self.end_date
    }

    /// Move every queued buffer and the end date by `delta`
    pub fn shift(&mut self, delta: Mtime) {
        for buffer in self.buffers.iter_mut() {
            buffer.pts = buffer.pts.saturating_add(delta);
        }
        if let Some(end) = self.end_date.as_mut() {
            *end = end.saturating_add(delta);
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Timestamp of the oldest queued buffer
    pub fn first_pts(&self) -> Option<Mtime> {
        self.buffers.front().map(|b| b.pts)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AudioBuffer> {
        self.buffers.iter()
    }

    /// Total duration of the queued buffers
    pub fn duration(&self) -> Mtime {
        self.buffers.iter().fold(0, |acc: Mtime, b| acc.saturating_add(b.length))
    }
}
