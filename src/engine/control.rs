//! Per-frame control resolution
//!
//! Each continuous control is either a held value or a modulation stream
//! read frame by frame. The engine only ever sees the resolved `Params`.

use super::Params;
use crate::synth::{GateFlags, RunMode};

/// A control value: held scalar or per-frame signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput<'a> {
    Held(f64),
    /// Streamed values; frames past the end repeat the last value
    Signal(&'a [f64]),
}

impl ControlInput<'_> {
    /// Value at a frame
    pub fn value_at(&self, frame: usize) -> f64 {
        match *self {
            ControlInput::Held(value) => value,
            ControlInput::Signal(values) => values
                .get(frame)
                .or_else(|| values.last())
                .copied()
                .unwrap_or(0.0),
        }
    }
}

/// Inputs for a modulated render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlInputs<'a> {
    pub mode: RunMode,
    /// Per-sample phase increment
    pub frequency: ControlInput<'a>,
    pub slope: ControlInput<'a>,
    pub shape: ControlInput<'a>,
    pub smoothness: ControlInput<'a>,
    pub shift: ControlInput<'a>,
    /// Per-frame gates; missing frames are low
    pub gates: &'a [GateFlags],
}

impl Default for ControlInputs<'_> {
    fn default() -> Self {
        let defaults = Params::default();
        Self {
            mode: defaults.mode,
            frequency: ControlInput::Held(defaults.frequency),
            slope: ControlInput::Held(defaults.slope),
            shape: ControlInput::Held(defaults.shape),
            smoothness: ControlInput::Held(defaults.smoothness),
            shift: ControlInput::Held(defaults.shift),
            gates: &[],
        }
    }
}

impl ControlInputs<'_> {
    /// Resolve the parameter set for one frame
    pub fn params_at(&self, frame: usize) -> Params {
        Params {
            mode: self.mode,
            frequency: self.frequency.value_at(frame),
            slope: self.slope.value_at(frame),
            shape: self.shape.value_at(frame),
            smoothness: self.smoothness.value_at(frame),
            shift: self.shift.value_at(frame),
            gate: self.gates.get(frame).copied().unwrap_or_default(),
        }
    }
}

/// Periodic gate generator for the envelope modes
///
/// Raises a trigger edge every `period` samples and keeps the gate high for
/// `length` samples.
#[derive(Debug, Clone)]
pub struct GateSchedule {
    period: u64,
    length: u64,
    position: u64,
}

impl GateSchedule {
    /// Build from durations in seconds
    pub fn new(period_secs: f64, length_secs: f64, sample_rate: f64) -> Self {
        let period = ((period_secs * sample_rate).round() as u64).max(1);
        let length = ((length_secs * sample_rate).round() as u64).min(period);
        Self {
            period,
            length,
            position: 0,
        }
    }

    /// Period in samples
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Gate-high length in samples
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Restart at the next trigger edge
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Gate flags for the next frame
    pub fn next_gate(&mut self) -> GateFlags {
        let flags = if self.position == 0 {
            GateFlags::trigger()
        } else if self.position < self.length {
            GateFlags::high()
        } else {
            GateFlags::low()
        };

        self.position += 1;
        if self.position >= self.period {
            self.position = 0;
        }
        flags
    }
}
