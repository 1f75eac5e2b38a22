// mod.rs - Audio output pipeline

//! Decoder-facing audio output pipeline.
//!
//! A [`Coordinator`] admits one decoder stream at a time and owns the output
//! device and mixer created for it. Decoders drive the stream through the
//! operations in [`dec`]: create, request buffer, submit, pause, flush,
//! destroy.

pub mod buffer;
pub mod coordinator;
pub mod dec;
pub mod error;
pub mod fifo;
pub mod format;
pub mod input;
pub mod lock_order;
pub mod mixer;
pub mod output;
pub mod replay_gain;
pub mod types;

pub use buffer::AudioBuffer;
pub use coordinator::{Coordinator, OutputVars};
pub use dec::StreamHandle;
pub use error::{AoutError, Result};
pub use fifo::AudioFifo;
pub use format::AudioFormat;
pub use input::{InputStream, VideoRequest};
pub use mixer::{AudioMixer, MixerFactory, SoftwareMixer, SoftwareMixerFactory};
pub use output::{AudioOutput, NullOutput, NullOutputFactory, OutputFactory, PlayedBuffer};
pub use replay_gain::{ReplayGain, ReplayGainMode, ReplayGainSettings};
pub use types::{ChannelMask, ChannelMode, ErrorCause, Mtime, SampleFormat, StreamState};
