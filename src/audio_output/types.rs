// types.rs - Core types and constants for the audio output pipeline

//! Core types shared by every stage of the decoder-facing audio output.
//!
//! Timestamps and durations are expressed in microseconds ([`Mtime`]).
//! Channel layouts are bit masks, one bit per physical speaker position.

/// Time in microseconds
pub type Mtime = i64;

/// Microseconds per second
pub const CLOCK_FREQ: i64 = 1_000_000;

/// Maximum number of channels a stream may carry
pub const AOUT_CHAN_MAX: u32 = 32;

/// Lowest accepted sample rate (Hz)
pub const AOUT_MIN_RATE: u32 = 4_000;

/// Highest accepted sample rate (Hz)
pub const AOUT_MAX_RATE: u32 = 192_000;

/// Playback-rate multiplier meaning "normal speed"
///
/// Rates are expressed in thousandths: 500 plays twice as fast, 2000 at half
/// speed.
pub const INPUT_RATE_DEFAULT: i32 = 1000;

/// Largest speed-up or slow-down factor the input pipeline accepts
pub const AOUT_MAX_INPUT_RATE: i32 = 4;

/// Slowest accepted playback-rate multiplier
pub const INPUT_RATE_MIN: i32 = INPUT_RATE_DEFAULT / AOUT_MAX_INPUT_RATE;

/// Fastest accepted playback-rate multiplier
pub const INPUT_RATE_MAX: i32 = INPUT_RATE_DEFAULT * AOUT_MAX_INPUT_RATE;

/// Default tolerated advance of a buffer against the queue (µs)
pub const AOUT_MAX_PTS_ADVANCE: Mtime = 40_000;

/// Default tolerated delay of a buffer against the queue (µs)
pub const AOUT_MAX_PTS_DELAY: Mtime = 60_000;

/// Largest advance or delay tolerance the configuration accepts (µs)
pub const AOUT_MAX_PTS_TOLERANCE: Mtime = 10 * CLOCK_FREQ;

/// Duration of `nb_samples` samples at `rate` Hz
///
/// `None` when the result does not fit in an [`Mtime`]. A zero rate has no
/// duration.
pub fn samples_duration(nb_samples: usize, rate: u32) -> Option<Mtime> {
    if rate == 0 {
        return Some(0);
    }
    let samples = Mtime::try_from(nb_samples).ok()?;
    samples.checked_mul(CLOCK_FREQ).map(|us| us / rate as Mtime)
}

/// Channel layout bit mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    pub const CENTER: ChannelMask = ChannelMask(0x1);
    pub const LEFT: ChannelMask = ChannelMask(0x2);
    pub const RIGHT: ChannelMask = ChannelMask(0x4);
    pub const REAR_CENTER: ChannelMask = ChannelMask(0x10);
    pub const REAR_LEFT: ChannelMask = ChannelMask(0x20);
    pub const REAR_RIGHT: ChannelMask = ChannelMask(0x40);
    pub const MIDDLE_LEFT: ChannelMask = ChannelMask(0x100);
    pub const MIDDLE_RIGHT: ChannelMask = ChannelMask(0x200);
    pub const LFE: ChannelMask = ChannelMask(0x1000);

    pub const MONO: ChannelMask = Self::CENTER;
    pub const STEREO: ChannelMask = ChannelMask(Self::LEFT.0 | Self::RIGHT.0);
    pub const SURROUND_5_1: ChannelMask = ChannelMask(
        Self::CENTER.0
            | Self::LEFT.0
            | Self::RIGHT.0
            | Self::REAR_LEFT.0
            | Self::REAR_RIGHT.0
            | Self::LFE.0,
    );

    /// Number of channels implied by the mask
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Mask with the `n` lowest bits set
    ///
    /// Used for layouts that have no named positions (n > 9).
    pub fn lowest(n: u32) -> ChannelMask {
        match n {
            0 => ChannelMask(0),
            n if n >= 32 => ChannelMask(u32::MAX),
            n => ChannelMask((1u32 << n) - 1),
        }
    }
}

/// Sample encoding of a PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    F32,
    F64,
}

impl SampleFormat {
    /// Bytes occupied by one sample of one channel
    pub fn bytes_per_sample(self) -> u32 {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S32 | SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }

    pub fn bits_per_sample(self) -> u32 {
        self.bytes_per_sample() * 8
    }
}

/// Why a stream is unusable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCause {
    /// Admission has not completed yet
    Setup,
    /// The output device could not be opened for the stream format
    OutputUnavailable,
    /// The mixer could not be created
    MixerUnavailable,
    /// The stream has been removed from its coordinator
    Removed,
}

impl std::fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCause::Setup => write!(f, "stream setup incomplete"),
            ErrorCause::OutputUnavailable => write!(f, "no output device"),
            ErrorCause::MixerUnavailable => write!(f, "no mixer"),
            ErrorCause::Removed => write!(f, "stream removed"),
        }
    }
}

/// Input stream lifecycle state
///
/// A stream starts out `Errored(Setup)` and only becomes `Active` once the
/// coordinator has created the output and mixer for it. Errors are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Active,
    Errored(ErrorCause),
}

impl StreamState {
    pub fn is_active(self) -> bool {
        matches!(self, StreamState::Active)
    }

    pub fn error_cause(self) -> Option<ErrorCause> {
        match self {
            StreamState::Active => None,
            StreamState::Errored(cause) => Some(cause),
        }
    }
}

/// Channel routing chosen for the current output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    ReverseStereo,
    Left,
    Right,
    Dolby,
}
