// output.rs - Output device collaborator

//! Output devices consumed by the coordinator.
//!
//! The coordinator never talks to a device directly; it asks an
//! [`OutputFactory`] for an [`AudioOutput`] matching the admitted stream's
//! format and tears it down when the stream goes away. [`NullOutput`]
//! discards samples but keeps a log of what it was given.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::audio_output::buffer::AudioBuffer;
use crate::audio_output::error::{AoutError, Result};
use crate::audio_output::format::AudioFormat;
use crate::audio_output::types::Mtime;

/// An opened output device
pub trait AudioOutput: Send {
    /// Backend name, for logs
    fn name(&self) -> &str;

    /// Format the device was opened with
    fn format(&self) -> &AudioFormat;

    /// Take ownership of a mixed buffer and render it
    fn play(&mut self, buffer: AudioBuffer) -> Result<()>;

    /// Drop anything the device has not rendered yet
    fn flush(&mut self);
}

/// Opens output devices
pub trait OutputFactory: Send + Sync {
    fn create_output(&self, format: &AudioFormat) -> Result<Box<dyn AudioOutput>>;
}

/// What a [`NullOutput`] saw for one buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayedBuffer {
    pub pts: Mtime,
    pub length: Mtime,
    pub nb_samples: usize,
    pub data: Vec<u8>,
}

/// Shared record of delivered buffers
pub type PlaybackLog = Arc<Mutex<Vec<PlayedBuffer>>>;

/// Output that renders nothing
pub struct NullOutput {
    format: AudioFormat,
    log: PlaybackLog,
}

impl NullOutput {
    pub fn new(format: AudioFormat, log: PlaybackLog) -> Self {
        NullOutput { format, log }
    }
}

impl AudioOutput for NullOutput {
    fn name(&self) -> &str {
        "null"
    }

    fn format(&self) -> &AudioFormat {
        &self.format
    }

    fn play(&mut self, buffer: AudioBuffer) -> Result<()> {
        self.log.lock().push(PlayedBuffer {
            pts: buffer.pts,
            length: buffer.length,
            nb_samples: buffer.nb_samples,
            data: buffer.data().to_vec(),
        });
        Ok(())
    }

    fn flush(&mut self) {
        log::trace!("null output flushed");
    }
}

/// Factory producing [`NullOutput`]s that share one playback log
///
/// Creation can be made to fail to exercise the coordinator's degraded
/// admission path.
#[derive(Clone, Default)]
pub struct NullOutputFactory {
    log: PlaybackLog,
    fail: Arc<Mutex<bool>>,
    opened: Arc<Mutex<Vec<AudioFormat>>>,
}

impl NullOutputFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose `create_output` always fails
    pub fn failing() -> Self {
        let factory = Self::default();
        factory.set_failing(true);
        factory
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Log of every buffer played by outputs from this factory
    pub fn log(&self) -> PlaybackLog {
        Arc::clone(&self.log)
    }

    /// Snapshot of the playback log
    pub fn played(&self) -> Vec<PlayedBuffer> {
        self.log.lock().clone()
    }

    /// Formats every output was opened with, in order
    pub fn opened(&self) -> Vec<AudioFormat> {
        self.opened.lock().clone()
    }
}

impl OutputFactory for NullOutputFactory {
    fn create_output(&self, format: &AudioFormat) -> Result<Box<dyn AudioOutput>> {
        if *self.fail.lock() {
            return Err(AoutError::OutputFailure(format!(
                "cannot open null output for {} Hz",
                format.rate
            )));
        }
        self.opened.lock().push(format.clone());
        Ok(Box::new(NullOutput::new(format.clone(), self.log())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_output_records() {
        let factory = NullOutputFactory::new();
        let mut format = AudioFormat::stereo_s16(44_100);
        format.prepare();

        let mut output = factory.create_output(&format).unwrap();
        assert_eq!(output.name(), "null");
        assert_eq!(output.format().rate, 44_100);

        let mut buf = AudioBuffer::for_format(&format, 16).unwrap();
        buf.pts = 42;
        buf.compute_length(44_100);
        output.play(buf).unwrap();

        let played = factory.played();
        assert_eq!(played.len(), 1);
        assert_eq!(played[0].pts, 42);
        assert_eq!(played[0].nb_samples, 16);
        assert_eq!(played[0].data.len(), 64);
        assert_eq!(factory.opened().len(), 1);
    }

    #[test]
    fn test_failing_factory() {
        let factory = NullOutputFactory::failing();
        let format = AudioFormat::stereo_s16(44_100);
        assert!(matches!(
            factory.create_output(&format),
            Err(AoutError::OutputFailure(_))
        ));
        assert!(factory.opened().is_empty());

        factory.set_failing(false);
        assert!(factory.create_output(&format).is_ok());
    }

    #[test]
    fn test_null_output_flush() {
        let log = PlaybackLog::default();
        let mut output = NullOutput::new(AudioFormat::stereo_s16(8_000), log.clone());
        output.play(AudioBuffer::alloc(4, 1).unwrap()).unwrap();
        assert_eq!(log.lock().len(), 1);
        output.flush();
        // Delivered buffers stay recorded
        assert_eq!(log.lock().len(), 1);
    }
}
