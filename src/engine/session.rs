//! Offline render session
//!
//! Binds a configured engine to its gate schedule so callers can pull
//! frames without touching individual parameters.

use super::{frequency_to_increment, GateSchedule, Params, Recorder, SlopeEngine};
use crate::config::TidesConfig;
use crate::error::EngineError;
use crate::synth::GateFlags;

/// A configured engine plus everything needed to render it
pub struct Session {
    engine: SlopeEngine,
    schedule: Option<GateSchedule>,
    params: Params,
    channels: usize,
}

impl Session {
    /// Build from a validated config
    pub fn from_config(config: &TidesConfig) -> Result<Self, EngineError> {
        let sample_rate = config.audio.sample_rate as f64;
        let engine = SlopeEngine::with_settings(
            sample_rate,
            config.generator.shaper,
            config.smoothing,
        )?;
        Ok(Self::with_engine(engine, config))
    }

    /// Wrap an existing engine, taking controls from the config
    pub fn with_engine(engine: SlopeEngine, config: &TidesConfig) -> Self {
        let sample_rate = engine.sample_rate();
        let gen = &config.generator;
        let params = Params {
            mode: gen.mode,
            frequency: frequency_to_increment(gen.frequency * gen.freq_scale, sample_rate),
            slope: gen.slope,
            shape: gen.shape,
            smoothness: gen.smoothness,
            shift: gen.shift,
            gate: GateFlags::low(),
        };
        let schedule = config
            .gate
            .map(|gate| GateSchedule::new(gate.period, gate.length_secs(), sample_rate));

        Self {
            engine,
            schedule,
            params,
            channels: config.audio.channels.max(1) as usize,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.sample_rate()
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Base parameters, without the gate
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn engine(&self) -> &SlopeEngine {
        &self.engine
    }

    /// Render the next frame
    pub fn next_frame(&mut self) -> f64 {
        let mut params = self.params;
        if let Some(schedule) = self.schedule.as_mut() {
            params.gate = schedule.next_gate();
        }
        self.engine.next_sample(&params)
    }

    /// Fill an interleaved buffer, one engine frame per channel group
    pub fn fill(&mut self, out: &mut [f32]) {
        let channels = self.channels;
        for frame in out.chunks_mut(channels) {
            let sample = self.next_frame() as f32;
            frame.fill(sample);
        }
    }

    /// Render `frames` frames into a recorder, `block_frames` at a time
    pub fn render_to(
        &mut self,
        recorder: &mut Recorder,
        frames: u64,
        block_frames: usize,
    ) -> anyhow::Result<()> {
        let block_frames = block_frames.max(1);
        let mut buffer = vec![0.0f32; block_frames * self.channels];
        let mut remaining = frames;
        while remaining > 0 {
            let count = remaining.min(block_frames as u64) as usize;
            let block = &mut buffer[..count * self.channels];
            self.fill(block);
            recorder.write_buffer(block)?;
            remaining -= count as u64;
        }
        Ok(())
    }

    /// Restart the engine and the gate schedule
    pub fn reset(&mut self) {
        self.engine.reset();
        if let Some(schedule) = self.schedule.as_mut() {
            schedule.reset();
        }
    }
}
