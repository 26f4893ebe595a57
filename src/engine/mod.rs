//! Render engine for Tides
//!
//! Composes the phase accumulator, shaper and smoothness stage into a single
//! voice, plus the host-side pieces around it: control inputs, shared
//! parameters, offline sessions, WAV recording and real-time playback.

mod control;
mod player;
mod recorder;
mod session;
mod shared;

pub use control::{ControlInput, ControlInputs, GateSchedule};
pub use player::{list_output_devices, Player};
pub use recorder::Recorder;
pub use session::Session;
pub use shared::SharedParams;

use std::sync::Arc;

use crate::error::EngineError;
use crate::synth::{
    CurveTables, GateFlags, PhaseAccumulator, RunMode, Shaper, ShaperKind, SmoothingSettings,
    SmoothnessStage, Stage,
};

/// Largest per-sample phase increment (half the sample rate)
pub const MAX_INCREMENT: f64 = 0.5;
/// Slope is kept this far from 0 and 1
pub const SLOPE_MARGIN: f64 = 0.001;
/// Output while an envelope is idle: the bottom of the ramp
const REST_LEVEL: f64 = -1.0;

/// Convert a frequency in Hz to a per-sample phase increment
///
/// Clamped to `[0, 0.5]`; non-finite input or sample rate gives 0.
pub fn frequency_to_increment(hz: f64, sample_rate: f64) -> f64 {
    let increment = hz / sample_rate;
    if increment.is_finite() {
        increment.clamp(0.0, MAX_INCREMENT)
    } else {
        0.0
    }
}

/// Flat parameter set for one frame or block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    pub mode: RunMode,
    /// Per-sample phase increment
    pub frequency: f64,
    /// Fraction of the cycle spent rising
    pub slope: f64,
    pub shape: f64,
    pub smoothness: f64,
    /// Phase offset, loop mode only
    pub shift: f64,
    pub gate: GateFlags,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            mode: RunMode::Loop,
            frequency: 0.0,
            slope: 0.5,
            shape: 0.0,
            smoothness: 0.0,
            shift: 0.0,
            gate: GateFlags::low(),
        }
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

impl Params {
    /// Copy with every field forced into its safe range
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        Self {
            mode: self.mode,
            frequency: clamp_or(self.frequency, 0.0, MAX_INCREMENT, defaults.frequency),
            slope: clamp_or(self.slope, SLOPE_MARGIN, 1.0 - SLOPE_MARGIN, defaults.slope),
            shape: clamp_or(self.shape, 0.0, 1.0, defaults.shape),
            smoothness: clamp_or(self.smoothness, 0.0, 1.0, defaults.smoothness),
            shift: clamp_or(self.shift, 0.0, 1.0, defaults.shift),
            gate: self.gate,
        }
    }
}

/// One slope generator voice
///
/// Owns all mutable state. Curve tables are shared read-only and survive
/// `reset`.
pub struct SlopeEngine {
    sample_rate: f64,
    tables: Arc<CurveTables>,
    accumulator: PhaseAccumulator,
    shaper: Box<dyn Shaper>,
    smoothness: SmoothnessStage,
    run_mode: RunMode,
}

impl SlopeEngine {
    /// Create an engine with default smoothing settings
    pub fn new(sample_rate: f64, shaper: ShaperKind) -> Result<Self, EngineError> {
        Self::with_settings(sample_rate, shaper, SmoothingSettings::default())
    }

    /// Create an engine, building a fresh set of curve tables
    pub fn with_settings(
        sample_rate: f64,
        shaper: ShaperKind,
        settings: SmoothingSettings,
    ) -> Result<Self, EngineError> {
        let tables = Arc::new(CurveTables::build()?);
        Self::with_tables(sample_rate, shaper, settings, tables)
    }

    /// Create an engine on top of existing tables
    pub fn with_tables(
        sample_rate: f64,
        shaper: ShaperKind,
        settings: SmoothingSettings,
        tables: Arc<CurveTables>,
    ) -> Result<Self, EngineError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        settings.validate()?;

        tracing::debug!(sample_rate, ?shaper, "creating slope engine");

        Ok(Self {
            sample_rate,
            shaper: shaper.build(tables.clone()),
            tables,
            accumulator: PhaseAccumulator::new(),
            smoothness: SmoothnessStage::new(sample_rate, settings),
            run_mode: RunMode::Loop,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn shaper_kind(&self) -> ShaperKind {
        self.shaper.kind()
    }

    /// Tables backing this engine, for sharing with other engines
    pub fn tables(&self) -> Arc<CurveTables> {
        self.tables.clone()
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn stage(&self) -> Stage {
        self.accumulator.stage()
    }

    pub fn phase(&self) -> f64 {
        self.accumulator.phase()
    }

    /// Filter feedback registers
    pub fn filter_memory(&self) -> (f64, f64) {
        self.smoothness.memory()
    }

    /// Zero phase, stage and filter memory
    pub fn reset(&mut self) {
        self.accumulator.reset();
        self.smoothness.reset();
    }

    /// Restart the cycle, leaving stage and filter memory alone
    pub fn reset_phase(&mut self) {
        self.accumulator.reset_phase();
    }

    fn switch_mode(&mut self, mode: RunMode) {
        if mode != self.run_mode {
            if mode.is_envelope() {
                self.accumulator.reset();
            }
            self.run_mode = mode;
        }
    }

    /// Render one frame
    pub fn next_sample(&mut self, params: &Params) -> f64 {
        let p = params.sanitized();
        self.switch_mode(p.mode);

        let shift = if p.mode == RunMode::Loop { p.shift } else { 0.0 };
        let ramp = self.accumulator.advance(p.frequency, p.slope, p.mode, p.gate, shift);

        let shaped = if ramp.active {
            self.shaper.apply(ramp.position, ramp.segment, p.shape)
        } else {
            REST_LEVEL
        };

        self.smoothness.process(shaped, p.smoothness)
    }

    /// Render a block with held parameters
    ///
    /// A rising gate edge only applies to the first frame.
    pub fn render(&mut self, params: &Params, out: &mut [f64]) {
        let mut frame_params = *params;
        for sample in out.iter_mut() {
            *sample = self.next_sample(&frame_params);
            frame_params.gate = frame_params.gate.held();
        }
    }

    /// Render interleaved frames, copying each value to every channel
    pub fn render_interleaved(&mut self, params: &Params, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let mut frame_params = *params;
        for frame in out.chunks_mut(channels) {
            let sample = self.next_sample(&frame_params) as f32;
            frame.fill(sample);
            frame_params.gate = frame_params.gate.held();
        }
    }

    /// Render with each control held or streamed per frame
    pub fn render_modulated(&mut self, inputs: &ControlInputs, out: &mut [f64]) {
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.next_sample(&inputs.params_at(i));
        }
    }
}
