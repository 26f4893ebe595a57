//! Parameters shared between a control thread and the audio callback
//!
//! Scalars are stored as `f64` bit patterns in atomics so readers never see
//! a torn value. Trigger and reset requests are latched until the audio
//! thread consumes them.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};

use super::{frequency_to_increment, Params};
use crate::config::TidesConfig;
use crate::synth::{GateFlags, RunMode};

#[derive(Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

fn mode_to_u8(mode: RunMode) -> u8 {
    match mode {
        RunMode::Loop => 0,
        RunMode::AttackDecay => 1,
        RunMode::AttackRelease => 2,
    }
}

fn mode_from_u8(value: u8) -> RunMode {
    match value {
        1 => RunMode::AttackDecay,
        2 => RunMode::AttackRelease,
        _ => RunMode::Loop,
    }
}

/// Lock-free parameter block
#[derive(Debug)]
pub struct SharedParams {
    mode: AtomicU8,
    frequency_hz: AtomicF64,
    freq_scale: AtomicF64,
    slope: AtomicF64,
    shape: AtomicF64,
    smoothness: AtomicF64,
    shift: AtomicF64,
    gate_high: AtomicBool,
    trigger_pending: AtomicBool,
    reset_pending: AtomicBool,
    phase_reset_pending: AtomicBool,
}

impl Default for SharedParams {
    fn default() -> Self {
        Self {
            mode: AtomicU8::new(mode_to_u8(RunMode::Loop)),
            frequency_hz: AtomicF64::new(1.0),
            freq_scale: AtomicF64::new(1.0),
            slope: AtomicF64::new(0.5),
            shape: AtomicF64::new(0.0),
            smoothness: AtomicF64::new(0.0),
            shift: AtomicF64::new(0.0),
            gate_high: AtomicBool::new(false),
            trigger_pending: AtomicBool::new(false),
            reset_pending: AtomicBool::new(false),
            phase_reset_pending: AtomicBool::new(false),
        }
    }
}

impl SharedParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial values from the generator section of a config
    pub fn from_config(config: &TidesConfig) -> Self {
        let gen = &config.generator;
        let shared = Self::new();
        shared.set_mode(gen.mode);
        shared.frequency_hz.store(gen.frequency);
        shared.freq_scale.store(gen.freq_scale);
        shared.slope.store(gen.slope);
        shared.shape.store(gen.shape);
        shared.smoothness.store(gen.smoothness);
        shared.shift.store(gen.shift);
        shared
    }

    pub fn set_mode(&self, mode: RunMode) {
        self.mode.store(mode_to_u8(mode), Ordering::Relaxed);
    }

    pub fn mode(&self) -> RunMode {
        mode_from_u8(self.mode.load(Ordering::Relaxed))
    }

    /// Set a continuous parameter by name
    ///
    /// Returns false for unknown names.
    pub fn set_parameter(&self, name: &str, value: f64) -> bool {
        let target = match name {
            "frequency" | "freq" => &self.frequency_hz,
            "freq_scale" | "freqscale" => &self.freq_scale,
            "slope" | "pw" => &self.slope,
            "shape" => &self.shape,
            "smoothness" | "smooth" => &self.smoothness,
            "shift" | "phase" => &self.shift,
            _ => return false,
        };
        target.store(value);
        true
    }

    /// Read a continuous parameter by name
    pub fn get_parameter(&self, name: &str) -> Option<f64> {
        let source = match name {
            "frequency" | "freq" => &self.frequency_hz,
            "freq_scale" | "freqscale" => &self.freq_scale,
            "slope" | "pw" => &self.slope,
            "shape" => &self.shape,
            "smoothness" | "smooth" => &self.smoothness,
            "shift" | "phase" => &self.shift,
            _ => return None,
        };
        Some(source.load())
    }

    /// Set the held gate level
    ///
    /// A low-to-high change latches a trigger edge for the next frame.
    pub fn set_gate(&self, high: bool) {
        let was_high = self.gate_high.swap(high, Ordering::AcqRel);
        if high && !was_high {
            self.trigger_pending.store(true, Ordering::Release);
        }
    }

    pub fn gate_high(&self) -> bool {
        self.gate_high.load(Ordering::Relaxed)
    }

    /// Request a trigger edge on the next frame
    ///
    /// The held gate level is left alone, so in AR mode a bare trigger
    /// releases straight after the edge.
    pub fn trigger(&self) {
        self.trigger_pending.store(true, Ordering::Release);
    }

    /// Request an engine reset before the next frame
    pub fn request_reset(&self) {
        self.reset_pending.store(true, Ordering::Release);
    }

    /// Consume a pending reset request
    pub fn take_reset(&self) -> bool {
        self.reset_pending.swap(false, Ordering::Acquire)
    }

    /// Request a phase restart before the next frame
    ///
    /// Unlike `request_reset`, stage and filter memory are kept.
    pub fn request_phase_reset(&self) {
        self.phase_reset_pending.store(true, Ordering::Release);
    }

    /// Consume a pending phase restart
    pub fn take_phase_reset(&self) -> bool {
        self.phase_reset_pending.swap(false, Ordering::Acquire)
    }

    /// Snapshot for one frame, consuming any pending trigger
    pub fn params(&self, sample_rate: f64) -> Params {
        let rising = self.trigger_pending.swap(false, Ordering::Acquire);
        let high = self.gate_high.load(Ordering::Relaxed);
        let gate = match (rising, high) {
            (true, _) => GateFlags::trigger(),
            (false, true) => GateFlags::high(),
            (false, false) => GateFlags::low(),
        };

        let hz = self.frequency_hz.load() * self.freq_scale.load();
        Params {
            mode: self.mode(),
            frequency: frequency_to_increment(hz, sample_rate),
            slope: self.slope.load(),
            shape: self.shape.load(),
            smoothness: self.smoothness.load(),
            shift: self.shift.load(),
            gate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_defaults() {
        let shared = SharedParams::new();
        assert_eq!(shared.mode(), RunMode::Loop);
        assert_eq!(shared.get_parameter("slope"), Some(0.5));
        assert_eq!(shared.get_parameter("nonsense"), None);
    }

    #[test]
    fn test_from_config() {
        let mut config = TidesConfig::default();
        config.generator.mode = RunMode::AttackDecay;
        config.generator.shape = 0.3;
        config.generator.frequency = 96.0;

        let shared = SharedParams::from_config(&config);
        let params = shared.params(48000.0);
        assert_eq!(params.mode, RunMode::AttackDecay);
        assert_eq!(params.shape, 0.3);
        assert_eq!(params.frequency, 0.002);
    }

    #[test]
    fn test_set_parameter_aliases() {
        let shared = SharedParams::new();
        assert!(shared.set_parameter("pw", 0.2));
        assert!(shared.set_parameter("smooth", 0.8));
        assert!(!shared.set_parameter("volume", 1.0));

        assert_eq!(shared.get_parameter("slope"), Some(0.2));
        assert_eq!(shared.get_parameter("smoothness"), Some(0.8));
    }

    #[test]
    fn test_params_snapshot() {
        let shared = SharedParams::new();
        shared.set_parameter("frequency", 480.0);
        shared.set_parameter("freq_scale", 0.5);
        shared.set_mode(RunMode::AttackRelease);

        let params = shared.params(48000.0);
        assert_eq!(params.mode, RunMode::AttackRelease);
        assert_eq!(params.frequency, 0.005);
        assert_eq!(params.gate, GateFlags::low());
    }

    #[test]
    fn test_trigger_is_consumed_once() {
        let shared = SharedParams::new();
        shared.trigger();

        assert!(shared.params(48000.0).gate.is_rising());
        assert_eq!(shared.params(48000.0).gate, GateFlags::low());

        shared.set_gate(true);
        shared.params(48000.0);
        shared.trigger();
        assert_eq!(shared.params(48000.0).gate, GateFlags::trigger());
        assert_eq!(shared.params(48000.0).gate, GateFlags::high());
    }

    #[test]
    fn test_gate_on_raises_one_edge() {
        let shared = SharedParams::new();
        shared.set_gate(true);
        assert!(shared.gate_high());
        assert_eq!(shared.params(48000.0).gate, GateFlags::trigger());
        assert_eq!(shared.params(48000.0).gate, GateFlags::high());

        // Already high: no new edge
        shared.set_gate(true);
        assert_eq!(shared.params(48000.0).gate, GateFlags::high());

        shared.set_gate(false);
        assert_eq!(shared.params(48000.0).gate, GateFlags::low());
        shared.set_gate(true);
        assert_eq!(shared.params(48000.0).gate, GateFlags::trigger());
    }

    #[test]
    fn test_phase_reset_is_separate_from_reset() {
        let shared = SharedParams::new();
        shared.request_phase_reset();
        assert!(!shared.take_reset());
        assert!(shared.take_phase_reset());
        assert!(!shared.take_phase_reset());
    }

    #[test]
    fn test_reset_is_consumed_once() {
        let shared = SharedParams::new();
        assert!(!shared.take_reset());
        shared.request_reset();
        assert!(shared.take_reset());
        assert!(!shared.take_reset());
    }

    #[test]
    fn test_cross_thread_updates_never_tear() {
        let shared = Arc::new(SharedParams::new());
        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for i in 0..10_000 {
                    let value = if i % 2 == 0 { 0.25 } else { 0.75 };
                    shared.set_parameter("shape", value);
                }
            })
        };

        for _ in 0..10_000 {
            let shape = shared.params(48000.0).shape;
            assert!(shape == 0.0 || shape == 0.25 || shape == 0.75);
        }
        writer.join().unwrap();
    }
}
