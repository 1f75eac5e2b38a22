use crate::audio_output::{AudioFormat, ChannelMask, SampleFormat};
use crate::config::{parse_volume, PipelineConfig};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u32 = 2;
pub const DEFAULT_SAMPLES: usize = 1024;
pub const DEFAULT_BUFFERS: usize = 64;

/// Audio output pipeline simulator
#[derive(Parser, Debug, Default)]
#[command(name = "aout-sim")]
#[command(version = "0.8.0")]
#[command(about = "Drives the decoder-facing audio output pipeline with synthetic audio", long_about = None)]
pub struct Cli {
    /// Sample rate in Hz (default 44100)
    #[arg(short, long, value_name = "HZ")]
    pub rate: Option<u32>,

    /// Channel count (default 2)
    #[arg(short, long, value_name = "COUNT")]
    pub channels: Option<u32>,

    /// Samples per buffer (default 1024)
    #[arg(short, long, value_name = "COUNT")]
    pub samples: Option<usize>,

    /// Number of buffers the decoder produces (default 64)
    #[arg(short, long, value_name = "COUNT")]
    pub buffers: Option<usize>,

    /// Pause once this many buffers have been submitted
    #[arg(long = "pause-at", value_name = "INDEX")]
    pub pause_at: Option<usize>,

    /// How long the pause lasts in milliseconds
    #[arg(long = "pause-ms", value_name = "MS", default_value_t = 100)]
    pub pause_ms: u64,

    /// Mixer volume multiplier (0.0-2.0)
    #[arg(long, value_name = "VOLUME")]
    pub volume: Option<String>,

    /// Pipeline configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Merge CLI arguments into the pipeline configuration
    pub fn merge_into_config(&self, mut config: PipelineConfig) -> Result<PipelineConfig> {
        if let Some(ref vol) = self.volume {
            let vol: f32 = vol.parse().context("Invalid volume")?;
            config.volume = parse_volume(vol);
        }
        Ok(config)
    }

    /// Stream format the simulated decoder produces
    pub fn format(&self) -> Result<AudioFormat> {
        let rate = self.rate.unwrap_or(DEFAULT_RATE);
        let channels = self.channels.unwrap_or(DEFAULT_CHANNELS);
        let mask = match channels {
            1 => ChannelMask::MONO,
            2 => ChannelMask::STEREO,
            6 => ChannelMask::SURROUND_5_1,
            n => ChannelMask::lowest(n),
        };

        let mut format = AudioFormat::new(SampleFormat::S16, rate, mask);
        format.channels = channels;
        format
            .sanitize()
            .with_context(|| format!("Unsupported format: {} Hz, {} channels", rate, channels))?;
        Ok(format)
    }

    pub fn samples(&self) -> usize {
        self.samples.unwrap_or(DEFAULT_SAMPLES).max(1)
    }

    pub fn buffers(&self) -> usize {
        self.buffers.unwrap_or(DEFAULT_BUFFERS)
    }
}
