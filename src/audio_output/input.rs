// input.rs - Per-decoder input stream

//! Input stream state and the input side of the pipeline.
//!
//! One [`InputStream`] exists per admitted decoder stream. Its flags live
//! behind the stream lock ([`LockRank::Input`]) and its pending buffers behind
//! a separate FIFO lock ([`LockRank::Fifo`]). Every mutation of the FIFO
//! (enqueue from `submit`, drain from the mixer, bulk clear from `flush`,
//! timestamp shift from resume) goes through the FIFO lock.

use std::sync::Arc;

use crate::audio_output::buffer::AudioBuffer;
use crate::audio_output::error::{AoutError, Result};
use crate::audio_output::fifo::AudioFifo;
use crate::audio_output::format::AudioFormat;
use crate::audio_output::lock_order::{LockRank, RankedGuard, RankedMutex};
use crate::audio_output::replay_gain::ReplayGain;
use crate::audio_output::types::*;
use crate::config::PipelineConfig;

/// Callback a visualization stage may use to obtain a video surface
///
/// The pipeline only stores it for the stream's lifetime.
pub type VideoRequest = Arc<dyn Fn(&AudioFormat) + Send + Sync>;

/// Drift allowed at `input_rate` for a base tolerance of `max` (µs)
fn drift_tolerance(input_rate: i32, max: Mtime) -> Mtime {
    (input_rate as Mtime)
        .saturating_mul(3)
        .saturating_mul(max)
        / INPUT_RATE_DEFAULT as Mtime
}

/// Mutable stream state guarded by the stream lock
#[derive(Debug)]
pub struct InputState {
    pub(crate) status: StreamState,
    pub(crate) paused: bool,
    pub(crate) pause_date: Mtime,
    /// Buffers dropped since the last reset
    pub(crate) dropped: u32,
    /// Replay-gain multiplier applied by the mixer
    pub(crate) multiplier: f32,
    /// Playback-rate multiplier the pipeline is configured for
    pub(crate) input_rate: i32,
    pub(crate) restart_requested: bool,
    pub(crate) restarts: u32,
    pub(crate) max_pts_advance: Mtime,
    pub(crate) max_pts_delay: Mtime,
}

impl InputState {
    fn new() -> Self {
        InputState {
            status: StreamState::Errored(ErrorCause::Setup),
            paused: false,
            pause_date: 0,
            dropped: 0,
            multiplier: 1.0,
            input_rate: INPUT_RATE_DEFAULT,
            restart_requested: false,
            restarts: 0,
            max_pts_advance: AOUT_MAX_PTS_ADVANCE,
            max_pts_delay: AOUT_MAX_PTS_DELAY,
        }
    }

    pub fn status(&self) -> StreamState {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub(crate) fn note_dropped(&mut self) {
        self.dropped = self.dropped.saturating_add(1);
    }
}

/// One admitted decoder stream
pub struct InputStream {
    format: AudioFormat,
    replay_gain: ReplayGain,
    video_request: Option<VideoRequest>,
    state: RankedMutex<InputState>,
    fifo: RankedMutex<AudioFifo>,
}

impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("format", &self.format)
            .field("replay_gain", &self.replay_gain)
            .field("video_request", &self.video_request.is_some())
            .finish()
    }
}

impl InputStream {
    /// Create a stream in the `Errored(Setup)` state
    pub(crate) fn new(
        format: AudioFormat,
        replay_gain: Option<ReplayGain>,
        video_request: Option<VideoRequest>,
    ) -> Self {
        InputStream {
            format,
            replay_gain: replay_gain.unwrap_or_default(),
            video_request,
            state: RankedMutex::new(LockRank::Input, InputState::new()),
            fifo: RankedMutex::new(LockRank::Fifo, AudioFifo::new()),
        }
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    pub fn replay_gain(&self) -> &ReplayGain {
        &self.replay_gain
    }

    pub fn has_video_request(&self) -> bool {
        self.video_request.is_some()
    }

    /// Take the stream lock
    pub fn lock_state(&self) -> RankedGuard<'_, InputState> {
        self.state.lock()
    }

    /// Take the FIFO lock
    pub fn lock_fifo(&self) -> RankedGuard<'_, AudioFifo> {
        self.fifo.lock()
    }

    pub fn state(&self) -> StreamState {
        self.lock_state().status
    }

    pub fn is_paused(&self) -> bool {
        self.lock_state().paused
    }

    /// Replay-gain multiplier currently in effect
    pub fn gain(&self) -> f32 {
        self.lock_state().multiplier
    }

    /// Playback-rate multiplier the pipeline was last configured for
    pub fn playback_rate(&self) -> i32 {
        self.lock_state().input_rate
    }

    /// Number of internal pipeline rebuilds since admission
    pub fn restart_count(&self) -> u32 {
        self.lock_state().restarts
    }

    /// Number of buffers waiting for the mixer
    pub fn pending(&self) -> usize {
        self.lock_fifo().len()
    }

    /// Build the input pipeline and mark the stream usable
    pub(crate) fn setup(&self, state: &mut InputState, config: &PipelineConfig) {
        self.configure(state, config);
        state.input_rate = INPUT_RATE_DEFAULT;
        state.restart_requested = false;
        state.status = StreamState::Active;
        log::debug!(
            "input ready: {} Hz, {} channels, gain {:.3}",
            self.format.rate,
            self.format.channels,
            state.multiplier
        );
    }

    fn configure(&self, state: &mut InputState, config: &PipelineConfig) {
        state.multiplier = self.replay_gain.multiplier(&config.replay_gain);
        state.max_pts_advance = config.max_pts_advance;
        state.max_pts_delay = config.max_pts_delay;
    }

    /// Rebuild the pipeline if a restart was requested or the rate changed
    ///
    /// Must run with the coordinator lock held.
    pub(crate) fn check_and_restart(
        &self,
        state: &mut InputState,
        config: &PipelineConfig,
        input_rate: i32,
    ) {
        if !state.restart_requested && state.input_rate == input_rate {
            return;
        }

        if state.input_rate != input_rate {
            log::debug!(
                "playback rate changed from {} to {}, reconfiguring",
                state.input_rate,
                input_rate
            );
        }

        self.configure(state, config);
        state.input_rate = input_rate;
        state.restart_requested = false;
        state.restarts += 1;
    }

    /// Align a buffer on the queue timeline and enqueue it
    ///
    /// The buffer is consumed whatever the outcome. Buffers that are far
    /// off the queue timeline are dropped and counted rather than rejected.
    pub(crate) fn play(
        &self,
        state: &mut InputState,
        mut buffer: AudioBuffer,
        input_rate: i32,
    ) -> Result<()> {
        if buffer.nb_samples == 0 {
            return Err(AoutError::PlaybackFailure("empty buffer".into()));
        }
        let expected = self.format.bytes_for(buffer.nb_samples);
        if expected != Some(buffer.len()) {
            return Err(AoutError::PlaybackFailure(format!(
                "buffer holds {} bytes, wrong size for {} samples",
                buffer.len(),
                buffer.nb_samples
            )));
        }

        let max_advance = drift_tolerance(input_rate, state.max_pts_advance);
        let max_delay = drift_tolerance(input_rate, state.max_pts_delay);

        let mut fifo = self.lock_fifo();
        let start = fifo.next_start().unwrap_or(buffer.pts);
        let drift = start.saturating_sub(buffer.pts);

        let start = if drift < -max_advance {
            log::warn!("buffer way too early ({}), clearing queue", drift);
            fifo.set(0);
            state.note_dropped();
            buffer.pts
        } else if drift > max_delay {
            log::warn!("buffer way too late ({}), dropping buffer", drift);
            state.note_dropped();
            return Ok(());
        } else {
            start
        };

        buffer.pts = start;
        fifo.push(buffer);
        Ok(())
    }

    /// Release the pipeline and make the stream permanently unusable
    pub(crate) fn teardown(&self, state: &mut InputState) {
        state.status = StreamState::Errored(ErrorCause::Removed);
        self.lock_fifo().set(0);
        log::debug!("input removed");
    }
}
