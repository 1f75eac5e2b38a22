// error.rs - Error taxonomy for the audio output pipeline

//! Errors returned by the decoder-facing API and its collaborators.

use crate::audio_output::types::ErrorCause;

/// Audio output error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AoutError {
    /// Stream format rejected before anything was allocated
    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    /// Memory for a buffer or stream could not be obtained
    #[error("Resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// The stream is in its sticky error state
    #[error("Stream error: {0}")]
    StreamError(ErrorCause),

    /// The handle is not the currently admitted stream
    #[error("Stream not found")]
    NotFound,

    /// The input pipeline rejected a submitted buffer
    #[error("Playback failure: {0}")]
    PlaybackFailure(String),

    /// Another stream already occupies the admission slot
    #[error("A stream is already admitted")]
    AlreadyAdmitted,

    /// Caller passed an argument outside the contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Output device creation or playback failed
    #[error("Output failure: {0}")]
    OutputFailure(String),

    /// Mixer creation or execution failed
    #[error("Mixer failure: {0}")]
    MixerFailure(String),
}

/// Result type for audio output operations
pub type Result<T> = std::result::Result<T, AoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            AoutError::InvalidFormat("too many audio channels (40)".into()).to_string(),
            "Invalid audio format: too many audio channels (40)"
        );
        assert_eq!(
            AoutError::StreamError(ErrorCause::OutputUnavailable).to_string(),
            "Stream error: no output device"
        );
        assert_eq!(AoutError::NotFound.to_string(), "Stream not found");
    }
}
