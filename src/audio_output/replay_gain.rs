// replay_gain.rs - Replay gain selection

//! Turns stream replay-gain metadata into a linear amplitude multiplier.

use std::str::FromStr;

/// Which replay-gain value to honour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayGainMode {
    #[default]
    None,
    Track,
    Album,
}

impl FromStr for ReplayGainMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ReplayGainMode::None),
            "track" => Ok(ReplayGainMode::Track),
            "album" => Ok(ReplayGainMode::Album),
            other => Err(format!("unknown replay gain mode '{}'", other)),
        }
    }
}

/// Replay-gain metadata carried by a stream (gains in dB, peaks linear)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReplayGain {
    pub track_gain: Option<f32>,
    pub track_peak: Option<f32>,
    pub album_gain: Option<f32>,
    pub album_peak: Option<f32>,
}

/// Replay-gain policy taken from the pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayGainSettings {
    pub mode: ReplayGainMode,
    /// Added to whichever gain is selected (dB)
    pub preamp: f32,
    /// Used when the stream carries no gain of either kind (dB)
    pub default_gain: f32,
    /// Keep `multiplier * peak` at or below 1.0
    pub peak_protection: bool,
}

impl Default for ReplayGainSettings {
    fn default() -> Self {
        ReplayGainSettings {
            mode: ReplayGainMode::None,
            preamp: 0.0,
            default_gain: -7.0,
            peak_protection: true,
        }
    }
}

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

impl ReplayGain {
    /// Linear multiplier for this metadata under `settings`
    pub fn multiplier(&self, settings: &ReplayGainSettings) -> f32 {
        let (gain, peak) = match settings.mode {
            ReplayGainMode::None => return 1.0,
            ReplayGainMode::Track => (
                self.track_gain.or(self.album_gain),
                self.track_peak.or(self.album_peak),
            ),
            ReplayGainMode::Album => (
                self.album_gain.or(self.track_gain),
                self.album_peak.or(self.track_peak),
            ),
        };

        let db = gain.unwrap_or(settings.default_gain) + settings.preamp;
        let mut multiplier = db_to_linear(db);

        if settings.peak_protection {
            if let Some(peak) = peak.filter(|p| *p > 0.0) {
                if multiplier * peak > 1.0 {
                    multiplier = 1.0 / peak;
                }
            }
        }

        multiplier
    }
}
