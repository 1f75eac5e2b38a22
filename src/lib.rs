// aout Rust library
// Decoder-facing audio output pipeline

pub mod audio_output;
pub mod cli;
pub mod config;
pub mod logging;
pub mod propfile;

pub use audio_output::{AoutError, AudioBuffer, AudioFormat, Coordinator, StreamHandle};
pub use cli::Cli;
pub use config::PipelineConfig;
pub use logging::LogLevel;
