use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::audio_output::replay_gain::{ReplayGainMode, ReplayGainSettings};
use crate::audio_output::types::{
    Mtime, AOUT_MAX_PTS_ADVANCE, AOUT_MAX_PTS_DELAY, AOUT_MAX_PTS_TOLERANCE,
};
use crate::propfile::parse_propfile;

/// Highest mixer multiplier accepted
pub const MAX_VOLUME: f32 = 2.0;

/// Pipeline options that can be set via config file or CLI
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Mixer multiplier applied to every drained buffer
    pub volume: f32,
    pub replay_gain: ReplayGainSettings,
    /// How far ahead of the queue a buffer may start before the queue is reset
    pub max_pts_advance: Mtime,
    /// How far behind the queue a buffer may start before it is dropped
    pub max_pts_delay: Mtime,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            replay_gain: ReplayGainSettings::default(),
            max_pts_advance: AOUT_MAX_PTS_ADVANCE,
            max_pts_delay: AOUT_MAX_PTS_DELAY,
        }
    }
}

impl PipelineConfig {
    /// Apply a single `key = value` setting
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_ascii_lowercase().as_str() {
            "volume" => {
                let v: f32 = value.parse().context("Invalid volume value")?;
                self.volume = parse_volume(v);
            }
            "replay_gain_mode" => {
                self.replay_gain.mode = value
                    .parse::<ReplayGainMode>()
                    .map_err(|e| anyhow::anyhow!(e))?;
            }
            "replay_gain_preamp" => {
                self.replay_gain.preamp = value.parse().context("Invalid preamp value")?;
            }
            "replay_gain_default" => {
                self.replay_gain.default_gain =
                    value.parse().context("Invalid default gain value")?;
            }
            "replay_gain_peak_protection" => {
                self.replay_gain.peak_protection = parse_bool(value)?;
            }
            "max_pts_advance" => {
                self.max_pts_advance = parse_delay(value).context("Invalid max_pts_advance")?;
            }
            "max_pts_delay" => {
                self.max_pts_delay = parse_delay(value).context("Invalid max_pts_delay")?;
            }
            other => log::warn!("ignoring unknown config key '{}'", other),
        }
        Ok(())
    }
}

/// Parse configuration text
pub fn parse_config(data: &str) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::default();
    let mut first_error = None;

    parse_propfile(data, &mut |line, key, value| {
        if first_error.is_some() {
            return;
        }
        if let Err(e) = config.set(key, value) {
            first_error = Some(e.context(format!("line {}: {}", line, key)));
        }
    });

    match first_error {
        Some(e) => Err(e),
        None => Ok(config),
    }
}

/// Load configuration from a file
///
/// No path, or a path that does not exist, yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    if !path.exists() {
        log::debug!("config file {} not found, using defaults", path.display());
        return Ok(PipelineConfig::default());
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&data).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Clamp a volume multiplier into [0, MAX_VOLUME]
pub fn parse_volume(vol: f32) -> f32 {
    if vol.is_nan() || vol < 0.0 {
        return 0.0;
    }
    if vol > MAX_VOLUME {
        return MAX_VOLUME;
    }
    vol
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Invalid boolean value '{}'", other),
    }
}

fn parse_delay(s: &str) -> Result<Mtime> {
    let v: Mtime = s.parse()?;
    if v < 0 {
        anyhow::bail!("Delay must not be negative");
    }
    if v > AOUT_MAX_PTS_TOLERANCE {
        anyhow::bail!(
            "Delay {} exceeds the {} us maximum",
            v,
            AOUT_MAX_PTS_TOLERANCE
        );
    }
    Ok(v)
}
