//! Real-time audio playback using cpal

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{GateSchedule, SharedParams, SlopeEngine};
use crate::config::TidesConfig;

/// Real-time audio player
///
/// The engine lives inside the audio callback; controls arrive through
/// `SharedParams`.
pub struct Player {
    stream: Option<Stream>,
    running: Arc<AtomicBool>,
    sample_rate: u32,
}

impl Player {
    pub fn new() -> Self {
        Self {
            stream: None,
            running: Arc::new(AtomicBool::new(false)),
            sample_rate: 0,
        }
    }

    /// Start playback on the configured output device
    pub fn start(&mut self, config: &TidesConfig, shared: Arc<SharedParams>) -> Result<()> {
        let host = cpal::default_host();
        let device = find_device(&host, config.audio.device.as_deref())?;

        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();
        let sample_rate = stream_config.sample_rate.0;

        tracing::info!(
            device = %device.name().unwrap_or_default(),
            sample_rate,
            channels = stream_config.channels,
            ?sample_format,
            "opening output stream"
        );

        let voice = Voice::new(config, sample_rate as f64, shared);

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();

        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, voice, running)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, voice, running)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, voice, running)?,
            other => return Err(anyhow!("Unsupported sample format: {:?}", other)),
        };

        stream.play()?;
        self.stream = Some(stream);
        self.sample_rate = sample_rate;

        Ok(())
    }

    /// Stop playback
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.stream = None;
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Sample rate of the open stream, 0 before `start`
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine state owned by the audio callback
struct Voice {
    engine: Option<SlopeEngine>,
    schedule: Option<GateSchedule>,
    shared: Arc<SharedParams>,
}

impl Voice {
    fn new(config: &TidesConfig, sample_rate: f64, shared: Arc<SharedParams>) -> Self {
        let engine = match SlopeEngine::with_settings(
            sample_rate,
            config.generator.shaper,
            config.smoothing,
        ) {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::warn!(error = %e, "engine construction failed, output will be silent");
                None
            }
        };
        let schedule = config
            .gate
            .map(|gate| GateSchedule::new(gate.period, gate.length_secs(), sample_rate));

        Self {
            engine,
            schedule,
            shared,
        }
    }

    fn next_sample(&mut self) -> f32 {
        let Some(engine) = self.engine.as_mut() else {
            return 0.0;
        };

        if self.shared.take_reset() {
            engine.reset();
            if let Some(schedule) = self.schedule.as_mut() {
                schedule.reset();
            }
        }
        if self.shared.take_phase_reset() {
            engine.reset_phase();
        }

        let mut params = self.shared.params(engine.sample_rate());
        if let Some(schedule) = self.schedule.as_mut() {
            let scheduled = schedule.next_gate();
            params.gate = params.gate | scheduled;
        }
        engine.next_sample(&params) as f32
    }
}

fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<Device> {
    match name {
        Some(wanted) => host
            .output_devices()?
            .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
            .ok_or_else(|| anyhow!("Output device not found: {}", wanted)),
        None => host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available")),
    }
}

fn build_stream<T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>>(
    device: &Device,
    config: &StreamConfig,
    mut voice: Voice,
    running: Arc<AtomicBool>,
) -> Result<Stream> {
    let channels = config.channels as usize;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if !running.load(Ordering::SeqCst) {
                // Fill with silence when stopped
                for sample in data.iter_mut() {
                    *sample = T::from_sample(0.0f32);
                }
                return;
            }

            for frame in data.chunks_mut(channels) {
                let sample = voice.next_sample();
                for channel_sample in frame.iter_mut() {
                    *channel_sample = T::from_sample(sample);
                }
            }
        },
        |err| {
            tracing::error!(error = %err, "audio stream error");
        },
        None,
    )?;

    Ok(stream)
}

/// List all available output devices
pub fn list_output_devices() -> Vec<(String, StreamConfig)> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let (Ok(name), Ok(config)) = (device.name(), device.default_output_config()) {
                devices.push((name, config.into()));
            }
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{RunMode, Stage};

    fn voice(shared: Arc<SharedParams>) -> Voice {
        let mut config = TidesConfig::default();
        config.audio.sample_rate = 1000;
        Voice::new(&config, 1000.0, shared)
    }

    #[test]
    fn test_gate_on_starts_attack_release() {
        let shared = Arc::new(SharedParams::new());
        shared.set_parameter("frequency", 20.0);
        shared.set_mode(RunMode::AttackRelease);
        shared.set_gate(true);

        let mut voice = voice(shared.clone());
        let out: Vec<f32> = (0..100).map(|_| voice.next_sample()).collect();
        let max = out.iter().cloned().fold(f32::MIN, f32::max);
        assert!(max > 0.99, "max output {}", max);
        assert!((out[99] - 1.0).abs() < 1e-6);

        shared.set_gate(false);
        for _ in 0..100 {
            voice.next_sample();
        }
        assert!((voice.next_sample() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_phase_reset_keeps_envelope_stage() {
        let shared = Arc::new(SharedParams::new());
        shared.set_parameter("frequency", 5.0);
        shared.set_mode(RunMode::AttackDecay);
        shared.trigger();

        let mut voice = voice(shared.clone());
        for _ in 0..20 {
            voice.next_sample();
        }
        let engine = voice.engine.as_ref().unwrap();
        assert_eq!(engine.stage(), Stage::Attack);
        assert!(engine.phase() > 0.0);

        shared.request_phase_reset();
        let restarted = voice.next_sample();
        let engine = voice.engine.as_ref().unwrap();
        assert_eq!(engine.stage(), Stage::Attack);
        assert!((restarted + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_loop_phase_reset_restarts_cycle() {
        let shared = Arc::new(SharedParams::new());
        shared.set_parameter("frequency", 10.0);

        let mut voice = voice(shared.clone());
        let first: Vec<f32> = (0..30).map(|_| voice.next_sample()).collect();
        for _ in 0..17 {
            voice.next_sample();
        }
        shared.request_phase_reset();
        let second: Vec<f32> = (0..30).map(|_| voice.next_sample()).collect();
        assert_eq!(first, second);
    }
}
