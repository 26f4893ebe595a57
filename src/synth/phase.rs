//! Phase accumulator
//!
//! Produces the asymmetric ramp: a rising segment lasting `slope` of the
//! cycle and a falling segment lasting the rest. Runs free in loop mode or
//! as a one-shot / gated envelope.

use serde::{Deserialize, Serialize};

/// How the accumulator advances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Free-running cycle
    #[default]
    Loop,
    /// One-shot attack then decay, started by a trigger edge
    AttackDecay,
    /// Attack, sustain while the gate is high, release when it falls
    AttackRelease,
}

impl RunMode {
    /// Whether this mode is driven by gates
    pub fn is_envelope(self) -> bool {
        !matches!(self, RunMode::Loop)
    }
}

/// Envelope stage (unused in loop mode)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    Attack,
    DecayOrRelease,
}

/// Which half of the ramp a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Rising,
    Falling,
}

/// Per-frame gate state
///
/// Bit 0 marks a rising edge on this frame, bit 1 that the gate is held high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateFlags(u8);

impl GateFlags {
    pub const RISING: u8 = 0x01;
    pub const HIGH: u8 = 0x02;

    /// Gate low, no edge
    pub const fn low() -> Self {
        Self(0)
    }

    /// Gate held high, no edge
    pub const fn high() -> Self {
        Self(Self::HIGH)
    }

    /// Rising edge, gate high from this frame on
    pub const fn trigger() -> Self {
        Self(Self::RISING | Self::HIGH)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & (Self::RISING | Self::HIGH))
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_rising(self) -> bool {
        self.0 & Self::RISING != 0
    }

    pub const fn is_high(self) -> bool {
        self.0 & Self::HIGH != 0
    }

    /// Same flags without the edge bit
    pub const fn held(self) -> Self {
        Self(self.0 & Self::HIGH)
    }
}

impl std::ops::BitOr for GateFlags {
    type Output = Self;

    /// Merge two gate sources: high if either is, rising if either rises
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Output of one accumulator step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    /// Position within the current segment, 0..=1
    pub position: f64,
    pub segment: Segment,
    /// False while an envelope is idle
    pub active: bool,
    /// Segment or stage differs from the previous step
    pub stage_changed: bool,
}

/// Double-precision phase accumulator
#[derive(Debug, Clone, Default)]
pub struct PhaseAccumulator {
    phase: f64,
    stage: Stage,
    segment: Option<Segment>,
    /// AR envelope holding at the top; cleared once release starts
    sustaining: bool,
}

impl PhaseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase (cycle phase in loop mode, envelope level otherwise)
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Return to phase 0, stage idle
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.stage = Stage::Idle;
        self.segment = None;
        self.sustaining = false;
    }

    /// Restart the cycle without touching the stage
    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    /// Advance by one sample.
    ///
    /// `increment` is the per-sample phase increment and `slope` the rising
    /// fraction; both are expected to be sanitized already (slope strictly
    /// inside (0, 1)).
    pub fn advance(
        &mut self,
        increment: f64,
        slope: f64,
        mode: RunMode,
        gate: GateFlags,
        shift: f64,
    ) -> Ramp {
        let previous_stage = self.stage;
        let previous_segment = self.segment;

        let (position, segment, active) = match mode {
            RunMode::Loop => self.advance_loop(increment, slope, shift),
            RunMode::AttackDecay => self.advance_envelope(increment, slope, gate, false),
            RunMode::AttackRelease => self.advance_envelope(increment, slope, gate, true),
        };

        self.segment = Some(segment);
        let stage_changed = self.stage != previous_stage
            || previous_segment.is_some_and(|s| s != segment);

        Ramp {
            position,
            segment,
            active,
            stage_changed,
        }
    }

    fn advance_loop(&mut self, increment: f64, slope: f64, shift: f64) -> (f64, Segment, bool) {
        let mut shifted = self.phase + shift;
        if shifted >= 1.0 {
            shifted -= 1.0;
        }

        let ramp = if shifted < slope {
            (shifted / slope, Segment::Rising, true)
        } else {
            ((shifted - slope) / (1.0 - slope), Segment::Falling, true)
        };

        // One period at most per sample, so a single subtraction wraps
        self.phase += increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        ramp
    }

    fn advance_envelope(
        &mut self,
        increment: f64,
        slope: f64,
        gate: GateFlags,
        sustain: bool,
    ) -> (f64, Segment, bool) {
        if gate.is_rising() {
            self.phase = 0.0;
            self.stage = Stage::Attack;
            self.sustaining = false;
        }

        let attack_rate = increment / slope;
        let fall_rate = increment / (1.0 - slope);

        match self.stage {
            Stage::Idle => {
                self.phase = 0.0;
                return (1.0, Segment::Falling, false);
            }
            // An edge-only gate still gets its first attack frame
            Stage::Attack if sustain && !gate.is_high() && !gate.is_rising() => {
                self.stage = Stage::DecayOrRelease;
            }
            Stage::Attack => {
                let position = self.phase;
                self.phase += attack_rate;
                if self.phase >= 1.0 {
                    self.stage = Stage::DecayOrRelease;
                    if sustain {
                        self.phase = 1.0;
                        self.sustaining = true;
                    } else {
                        // Carry the overshoot over as decay time
                        let overshoot = (self.phase - 1.0) * slope / (1.0 - slope);
                        self.phase = (1.0 - overshoot).max(0.0);
                    }
                }
                return (position, Segment::Rising, true);
            }
            Stage::DecayOrRelease => {}
        }

        let position = 1.0 - self.phase;
        if self.sustaining && sustain && gate.is_high() {
            return (0.0, Segment::Falling, true);
        }
        // Only a new edge leaves a release
        self.sustaining = false;

        self.phase -= fall_rate;
        if self.phase <= 0.0 {
            self.phase = 0.0;
            self.stage = Stage::Idle;
        }
        (position, Segment::Falling, true)
    }
}
