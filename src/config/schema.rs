//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::synth::{RunMode, ShaperKind, SmoothingSettings};

/// Main configuration for Tides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TidesConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Generator controls
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Smoothness stage constants
    #[serde(default)]
    pub smoothing: SmoothingSettings,

    /// Periodic gate for the envelope modes
    #[serde(default)]
    pub gate: Option<GateConfig>,
}

fn check_unit(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        bail!("{} must be between 0.0 and 1.0", name);
    }
    Ok(())
}

impl TidesConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate audio settings
        if self.audio.sample_rate < 8000 || self.audio.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.audio.buffer_size < 64 || self.audio.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }
        if self.audio.channels == 0 || self.audio.channels > 4 {
            bail!("Channels must be between 1 and 4");
        }

        // Validate generator controls
        let gen = &self.generator;
        if !(0.000001..=1000.0).contains(&gen.frequency) {
            bail!("Frequency must be between 0.000001 and 1000 Hz");
        }
        if !(0.0001..=1.0).contains(&gen.freq_scale) {
            bail!("Frequency scale must be between 0.0001 and 1.0");
        }
        check_unit("Slope", gen.slope)?;
        check_unit("Shape", gen.shape)?;
        check_unit("Smoothness", gen.smoothness)?;
        check_unit("Shift", gen.shift)?;

        self.smoothing.validate()?;

        if let Some(gate) = &self.gate {
            if !(gate.period.is_finite() && gate.period > 0.0) {
                bail!("Gate period must be positive");
            }
            if !(0.0..=gate.period).contains(&gate.length_secs()) {
                bail!("Gate length must be between 0 and the gate period");
            }
        }

        Ok(())
    }
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 48000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames per block for offline rendering (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output channels, each carrying the same signal (default: 1)
    #[serde(default = "default_channels")]
    pub channels: u16,

    /// Output device name (None = default device)
    pub device: Option<String>,
}

fn default_sample_rate() -> u32 { 48000 }
fn default_buffer_size() -> usize { 512 }
fn default_channels() -> u16 { 1 }

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            channels: default_channels(),
            device: None,
        }
    }
}

/// Generator controls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Run mode (default: loop)
    #[serde(default)]
    pub mode: RunMode,

    /// Shaping strategy (default: table)
    #[serde(default)]
    pub shaper: ShaperKind,

    /// Cycle frequency in Hz (default: 1.0)
    #[serde(default = "default_frequency")]
    pub frequency: f64,

    /// Multiplier on frequency, for slow modulation ranges (default: 1.0)
    #[serde(default = "default_freq_scale")]
    pub freq_scale: f64,

    /// Fraction of the cycle spent rising (default: 0.5)
    #[serde(default = "default_slope")]
    pub slope: f64,

    /// Curve morph, linear to arcsine (default: 0.0)
    #[serde(default)]
    pub shape: f64,

    /// Filter below 0.5, fold above (default: 0.0)
    #[serde(default)]
    pub smoothness: f64,

    /// Phase offset in loop mode (default: 0.0)
    #[serde(default)]
    pub shift: f64,
}

fn default_frequency() -> f64 { 1.0 }
fn default_freq_scale() -> f64 { 1.0 }
fn default_slope() -> f64 { 0.5 }

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            shaper: ShaperKind::default(),
            frequency: default_frequency(),
            freq_scale: default_freq_scale(),
            slope: default_slope(),
            shape: 0.0,
            smoothness: 0.0,
            shift: 0.0,
        }
    }
}

/// Periodic gate settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Seconds between trigger edges (default: 1.0)
    #[serde(default = "default_gate_period")]
    pub period: f64,

    /// Seconds the gate stays high (default: half the period)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
}

fn default_gate_period() -> f64 { 1.0 }

impl GateConfig {
    /// Gate-high time, falling back to half the period
    pub fn length_secs(&self) -> f64 {
        self.length.unwrap_or(self.period / 2.0)
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            period: default_gate_period(),
            length: None,
        }
    }
}
