// dec.rs - Decoder-facing audio output API

//! Operations a decoder (and its control thread) performs on the pipeline.
//!
//! A decoder calls [`Coordinator::create`] once per elementary stream, then
//! loops over [`Coordinator::request_buffer`], fills the buffer, and hands it
//! to [`Coordinator::submit`]. A control thread may pause, resume or flush at
//! any time. [`Coordinator::destroy`] removes the stream and releases the
//! output and mixer created for it.
//!
//! Locks are always taken coordinator first, then stream, then FIFO.
//! Buffer requests only take the stream lock so they never wait on output
//! reconfiguration.

use std::fmt;
use std::sync::Arc;

use crate::audio_output::buffer::AudioBuffer;
use crate::audio_output::coordinator::Coordinator;
use crate::audio_output::error::{AoutError, Result};
use crate::audio_output::format::AudioFormat;
use crate::audio_output::input::{InputStream, VideoRequest};
use crate::audio_output::replay_gain::ReplayGain;
use crate::audio_output::types::*;

/// Decoder's reference to an admitted input stream
///
/// Cloning the handle does not create a new stream. A handle stays valid
/// after its stream is destroyed; it just reports `Errored(Removed)`.
#[derive(Clone)]
pub struct StreamHandle(Arc<InputStream>);

impl StreamHandle {
    pub fn state(&self) -> StreamState {
        self.0.state()
    }

    pub fn is_paused(&self) -> bool {
        self.0.is_paused()
    }

    pub fn format(&self) -> &AudioFormat {
        self.0.format()
    }

    pub fn playback_rate(&self) -> i32 {
        self.0.playback_rate()
    }

    pub fn restart_count(&self) -> u32 {
        self.0.restart_count()
    }

    /// Buffers queued and not yet drained by the mixer
    pub fn pending(&self) -> usize {
        self.0.pending()
    }

    /// Whether both handles refer to the same stream
    pub fn same_stream(&self, other: &StreamHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StreamHandle").field(&self.0).finish()
    }
}

impl Coordinator {
    /// Admit a new decoder stream
    ///
    /// The format is validated and normalised before anything is allocated.
    /// If the output or the mixer cannot be created the stream is still
    /// admitted and returned, but permanently errored; the decoder learns
    /// about it from `request_buffer` returning `None` or `submit` failing
    /// with [`AoutError::StreamError`], and must then destroy it.
    pub fn create(
        &self,
        format: &AudioFormat,
        replay_gain: Option<&ReplayGain>,
        video_request: Option<VideoRequest>,
    ) -> Result<StreamHandle> {
        let mut format = format.clone();
        if let Err(e) = format.sanitize() {
            log::error!("cannot create audio input: {}", e);
            return Err(e);
        }

        let mut coordinator = self.lock();
        if coordinator.input.is_some() {
            log::error!("an audio input is already admitted");
            return Err(AoutError::AlreadyAdmitted);
        }

        let input = Arc::new(InputStream::new(
            format.clone(),
            replay_gain.copied(),
            video_request,
        ));
        coordinator.input = Some(Arc::clone(&input));
        coordinator.vars.clear();

        let output = match self.outputs.create_output(&format) {
            Ok(output) => output,
            Err(e) => {
                log::error!("no suitable audio output: {}", e);
                input.lock_state().status = StreamState::Errored(ErrorCause::OutputUnavailable);
                return Ok(StreamHandle(input));
            }
        };

        let mixer = match self.mixers.create_mixer(&format) {
            Ok(mixer) => mixer,
            Err(e) => {
                log::error!("cannot create audio mixer: {}", e);
                drop(output);
                input.lock_state().status = StreamState::Errored(ErrorCause::MixerUnavailable);
                return Ok(StreamHandle(input));
            }
        };

        log::debug!(
            "audio input admitted on {}: {} Hz, {} channels",
            output.name(),
            format.rate,
            format.channels
        );
        coordinator.output = Some(output);
        coordinator.mixer = Some(mixer);

        let mut state = input.lock_state();
        input.setup(&mut state, &coordinator.config);
        drop(state);

        Ok(StreamHandle(input))
    }

    /// Remove a stream and release its output and mixer
    pub fn destroy(&self, handle: StreamHandle) -> Result<()> {
        let mut coordinator = self.lock();
        let admitted = coordinator
            .input
            .as_ref()
            .is_some_and(|input| Arc::ptr_eq(input, &handle.0));
        if !admitted {
            log::error!("cannot remove unknown audio input");
            return Err(AoutError::NotFound);
        }

        if let Some(input) = coordinator.input.take() {
            let mut state = input.lock_state();
            input.teardown(&mut state);
        }
        coordinator.release_output();
        log::debug!("audio input removed");
        Ok(())
    }

    /// Allocate a buffer for `nb_samples` samples of the stream's format
    ///
    /// Returns `None` when the stream is errored or allocation fails. The
    /// buffer's `pts` and `length` are zero; the decoder sets `pts`.
    pub fn request_buffer(&self, handle: &StreamHandle, nb_samples: usize) -> Option<AudioBuffer> {
        if nb_samples == 0 {
            log::warn!("buffer requested for no samples");
            return None;
        }

        let state = handle.0.lock_state();
        if !state.status().is_active() {
            return None;
        }
        AudioBuffer::for_format(handle.0.format(), nb_samples)
    }

    /// Release a buffer that will not be submitted
    pub fn delete_buffer(&self, _handle: &StreamHandle, buffer: AudioBuffer) {
        drop(buffer);
    }

    /// Queue a filled buffer and let the mixer drain it
    ///
    /// The buffer is consumed in every case. `input_rate` is the playback
    /// rate multiplier scaled by 1000 and must lie in
    /// `[INPUT_RATE_MIN, INPUT_RATE_MAX]`; `pts` must be positive.
    pub fn submit(&self, handle: &StreamHandle, mut buffer: AudioBuffer, input_rate: i32) -> Result<()> {
        if !(INPUT_RATE_MIN..=INPUT_RATE_MAX).contains(&input_rate) {
            return Err(AoutError::InvalidArgument(format!(
                "playback rate {} outside [{}, {}]",
                input_rate, INPUT_RATE_MIN, INPUT_RATE_MAX
            )));
        }
        if buffer.pts <= 0 {
            return Err(AoutError::InvalidArgument(format!(
                "buffer timestamp {} is not positive",
                buffer.pts
            )));
        }

        let input = &handle.0;
        if buffer.compute_length(input.format().rate).is_none() {
            return Err(AoutError::PlaybackFailure(format!(
                "duration of {} samples overflows",
                buffer.nb_samples
            )));
        }

        let coordinator = self.lock();
        let mut state = input.lock_state();
        if let Some(cause) = state.status().error_cause() {
            return Err(AoutError::StreamError(cause));
        }
        input.check_and_restart(&mut state, &coordinator.config, input_rate);
        drop(coordinator);

        let played = input.play(&mut state, buffer, input_rate);
        drop(state);
        played?;

        self.lock().run_mixer();
        Ok(())
    }

    /// Pause or resume a stream at `date`
    ///
    /// On resume every buffer still queued is moved later by the time spent
    /// paused. Pausing an already paused stream is rejected.
    pub fn set_paused(&self, handle: &StreamHandle, paused: bool, date: Mtime) -> Result<()> {
        let input = &handle.0;
        let duration = {
            let mut state = input.lock_state();
            if paused && state.paused {
                return Err(AoutError::InvalidState("stream already paused".into()));
            }
            let duration = if state.paused {
                date.saturating_sub(state.pause_date)
            } else {
                0
            };
            state.paused = paused;
            state.pause_date = date;
            duration
        };

        if duration != 0 {
            let _coordinator = self.lock();
            input.lock_fifo().shift(duration);
            log::debug!("resumed after {} us", duration);
        }
        Ok(())
    }

    /// Discard every buffer waiting in the stream's FIFO
    pub fn flush(&self, handle: &StreamHandle) {
        handle.0.lock_fifo().set(0);
    }

    /// Return the dropped-buffer count and reset it to zero
    pub fn get_and_reset_dropped(&self, handle: &StreamHandle) -> u32 {
        std::mem::take(&mut handle.0.lock_state().dropped)
    }

    /// Rebuild the stream's pipeline on the next submit
    pub fn request_restart(&self, handle: &StreamHandle) {
        handle.0.lock_state().restart_requested = true;
    }
}
