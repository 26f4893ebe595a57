//! Smoothness stage
//!
//! One parameter covers two effects. Below the midpoint the signal runs
//! through a low-pass filter whose cutoff rises with the parameter; from the
//! midpoint up it is amplified and folded back into range, adding harmonics.
//! At the midpoint the signal passes unchanged.

use serde::{Deserialize, Serialize};

use super::filter::LowPass;
use crate::error::EngineError;

/// Boundary between filtering and folding
pub const MIDPOINT: f64 = 0.5;

/// Tunable constants of the smoothness stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingSettings {
    /// Smoothness values below this bypass the filter entirely
    #[serde(default = "default_bypass_below")]
    pub bypass_below: f64,

    /// Cutoff at the bottom of the filter range, in Hz
    #[serde(default = "default_min_cutoff_hz")]
    pub min_cutoff_hz: f64,

    /// Cutoff just below the midpoint, in Hz
    #[serde(default = "default_max_cutoff_hz")]
    pub max_cutoff_hz: f64,

    /// Fold gain at full smoothness
    #[serde(default = "default_fold_max_gain")]
    pub fold_max_gain: f64,
}

fn default_bypass_below() -> f64 { 0.1 }
fn default_min_cutoff_hz() -> f64 { 20.0 }
fn default_max_cutoff_hz() -> f64 { 20000.0 }
fn default_fold_max_gain() -> f64 { 9.0 }

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            bypass_below: default_bypass_below(),
            min_cutoff_hz: default_min_cutoff_hz(),
            max_cutoff_hz: default_max_cutoff_hz(),
            fold_max_gain: default_fold_max_gain(),
        }
    }
}

impl SmoothingSettings {
    /// Check the constants are usable
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: &str| Err(EngineError::InvalidSmoothing(msg.to_string()));

        if !(0.0..MIDPOINT).contains(&self.bypass_below) {
            return invalid("bypass_below must be in [0, 0.5)");
        }
        if !(self.min_cutoff_hz.is_finite() && self.min_cutoff_hz > 0.0) {
            return invalid("min_cutoff_hz must be positive");
        }
        if !(self.max_cutoff_hz.is_finite() && self.max_cutoff_hz > self.min_cutoff_hz) {
            return invalid("max_cutoff_hz must exceed min_cutoff_hz");
        }
        if !(self.fold_max_gain.is_finite() && self.fold_max_gain >= 1.0) {
            return invalid("fold_max_gain must be at least 1");
        }
        Ok(())
    }

    /// Filter cutoff for a smoothness value in the filter band
    ///
    /// Sweeps exponentially from `min_cutoff_hz` to `max_cutoff_hz`.
    pub fn cutoff_for(&self, smoothness: f64) -> f64 {
        let t = ((smoothness - self.bypass_below) / (MIDPOINT - self.bypass_below)).clamp(0.0, 1.0);
        self.min_cutoff_hz * (self.max_cutoff_hz / self.min_cutoff_hz).powf(t)
    }

    /// Fold gain for a smoothness value at or above the midpoint
    pub fn fold_gain_for(&self, smoothness: f64) -> f64 {
        let amount = ((smoothness - MIDPOINT) * 2.0).clamp(0.0, 1.0);
        1.0 + amount * (self.fold_max_gain - 1.0)
    }
}

/// Reflect a signal back into [-1, 1] like a triangle wavefolder
///
/// Whole fold periods are removed first so the reflection loop runs at most
/// twice for any finite input. Non-finite input folds to silence.
pub fn fold(sample: f64) -> f64 {
    if !sample.is_finite() {
        return 0.0;
    }
    if (-1.0..=1.0).contains(&sample) {
        return sample;
    }

    let mut folded = (sample + 1.0).rem_euclid(4.0) - 1.0;
    while !(-1.0..=1.0).contains(&folded) {
        if folded > 1.0 {
            folded = 2.0 - folded;
        } else {
            folded = -2.0 - folded;
        }
    }
    folded
}

/// Stateful filter-or-fold conditioner
#[derive(Debug, Clone)]
pub struct SmoothnessStage {
    settings: SmoothingSettings,
    filter: LowPass,
}

impl SmoothnessStage {
    pub fn new(sample_rate: f64, settings: SmoothingSettings) -> Self {
        Self {
            settings,
            filter: LowPass::new(sample_rate),
        }
    }

    pub fn settings(&self) -> &SmoothingSettings {
        &self.settings
    }

    /// Filter feedback registers
    pub fn memory(&self) -> (f64, f64) {
        self.filter.memory()
    }

    /// Clear filter memory
    pub fn reset(&mut self) {
        self.filter.reset();
    }

    /// Condition one sample
    pub fn process(&mut self, sample: f64, smoothness: f64) -> f64 {
        let smoothness = if smoothness.is_nan() { 0.0 } else { smoothness.clamp(0.0, 1.0) };

        if smoothness < self.settings.bypass_below {
            sample
        } else if smoothness < MIDPOINT {
            let cutoff = self.settings.cutoff_for(smoothness);
            self.filter.process_at(sample, cutoff)
        } else {
            fold(sample * self.settings.fold_gain_for(smoothness))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_validate() {
        assert!(SmoothingSettings::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_settings() {
        let bad_gain = SmoothingSettings { fold_max_gain: 0.5, ..Default::default() };
        assert!(bad_gain.validate().is_err());

        let bad_range = SmoothingSettings { max_cutoff_hz: 10.0, ..Default::default() };
        assert!(bad_range.validate().is_err());

        let bad_bypass = SmoothingSettings { bypass_below: 0.6, ..Default::default() };
        assert!(bad_bypass.validate().is_err());
    }

    #[test]
    fn test_midpoint_is_identity() {
        let mut stage = SmoothnessStage::new(48000.0, SmoothingSettings::default());
        for i in -100..=100 {
            let input = i as f64 / 100.0;
            assert_eq!(stage.process(input, MIDPOINT), input);
        }
        assert_eq!(stage.memory(), (0.0, 0.0));
    }

    #[test]
    fn test_bypass_near_zero() {
        let mut stage = SmoothnessStage::new(48000.0, SmoothingSettings::default());
        for i in 0..100 {
            let input = ((i * 7) % 13) as f64 / 6.5 - 1.0;
            assert_eq!(stage.process(input, 0.0), input);
            assert_eq!(stage.process(input, 0.05), input);
        }
    }

    #[test]
    fn test_cutoff_sweep_is_exponential() {
        let settings = SmoothingSettings::default();
        assert!((settings.cutoff_for(0.1) - 20.0).abs() < 1e-9);
        assert!((settings.cutoff_for(0.5) - 20000.0).abs() < 1e-6);
        // Halfway through the band is the geometric mean
        let mid = settings.cutoff_for(0.3);
        assert!((mid - (20.0f64 * 20000.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn test_low_smoothness_filters_square_wave() {
        let mut stage = SmoothnessStage::new(48000.0, SmoothingSettings::default());
        let mut max_output = 0.0f64;
        for i in 0..4800 {
            // 2.4 kHz square wave
            let input = if (i / 10) % 2 == 0 { 1.0 } else { -1.0 };
            let output = stage.process(input, 0.12);
            if i > 2400 {
                max_output = max_output.max(output.abs());
            }
        }
        assert!(max_output < 0.05, "Expected heavy filtering, got {}", max_output);
        assert_ne!(stage.memory(), (0.0, 0.0));
    }

    #[test]
    fn test_fold_gain_range() {
        let settings = SmoothingSettings::default();
        assert_eq!(settings.fold_gain_for(0.5), 1.0);
        assert_eq!(settings.fold_gain_for(1.0), 9.0);
        assert_eq!(settings.fold_gain_for(0.75), 5.0);
    }

    #[test]
    fn test_fold_matches_repeated_reflection() {
        fn reflect(mut x: f64) -> f64 {
            while !(-1.0..=1.0).contains(&x) {
                x = if x > 1.0 { 2.0 - x } else { -2.0 - x };
            }
            x
        }
        for i in -900..=900 {
            let x = i as f64 / 100.0;
            assert!((fold(x) - reflect(x)).abs() < 1e-9, "fold({}) = {}", x, fold(x));
        }
    }

    #[test]
    fn test_fold_bounded_for_extreme_input() {
        for x in [1e300, -1e300, 12345.678, -0.0, f64::MAX, f64::MIN] {
            let y = fold(x);
            assert!((-1.0..=1.0).contains(&y), "fold({}) = {}", x, y);
        }
        assert_eq!(fold(f64::NAN), 0.0);
        assert_eq!(fold(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_max_fold_stays_bounded() {
        let mut stage = SmoothnessStage::new(48000.0, SmoothingSettings::default());
        for _ in 0..1000 {
            let output = stage.process(0.9, 1.0);
            assert!((-1.0..=1.0).contains(&output));
        }
        // 0.9 * 9 = 8.1 folds to 0.1
        assert!((stage.process(0.9, 1.0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_memory() {
        let mut stage = SmoothnessStage::new(48000.0, SmoothingSettings::default());
        for _ in 0..100 {
            stage.process(1.0, 0.2);
        }
        stage.reset();
        assert_eq!(stage.memory(), (0.0, 0.0));
    }
}
