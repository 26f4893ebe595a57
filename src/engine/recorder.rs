//! Offline WAV output
//!
//! Rendered frames go to disk as 32-bit float samples, one interleaved
//! group per frame.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Interleaved float WAV writer
pub struct Recorder {
    writer: WavWriter<BufWriter<File>>,
    spec: WavSpec,
    frames: u64,
}

impl Recorder {
    /// Open `path` for `channels` interleaved channels at `sample_rate`
    pub fn new(path: &Path, sample_rate: u32, channels: u16) -> Result<Self> {
        let spec = WavSpec {
            channels: channels.max(1),
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("failed to create WAV file: {:?}", path))?;

        tracing::debug!(path = %path.display(), sample_rate, channels = spec.channels, "opened WAV output");
        Ok(Self {
            writer,
            spec,
            frames: 0,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.spec.channels
    }

    /// Whole frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.spec.sample_rate as f64
    }

    /// Append interleaved frames
    ///
    /// The block must hold a whole number of frames.
    pub fn write_buffer(&mut self, block: &[f32]) -> Result<()> {
        let channels = self.spec.channels as usize;
        if block.len() % channels != 0 {
            bail!("block of {} samples is not a whole number of {}-channel frames", block.len(), channels);
        }

        block
            .iter()
            .try_for_each(|&sample| self.writer.write_sample(sample))
            .context("failed to write sample")?;
        self.frames += (block.len() / channels) as u64;
        Ok(())
    }

    /// Flush and patch the header; the file is incomplete until this runs
    pub fn finalize(self) -> Result<()> {
        tracing::debug!(frames = self.frames, "finalizing WAV output");
        self.writer.finalize().context("failed to finalize WAV file")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_fresh_recorder_is_empty() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::new(file.path(), 48000, 2).unwrap();

        assert_eq!(recorder.sample_rate(), 48000);
        assert_eq!(recorder.channels(), 2);
        assert_eq!(recorder.frames_written(), 0);
        assert_eq!(recorder.duration_secs(), 0.0);
    }

    #[test]
    fn test_zero_channels_becomes_mono() {
        let file = NamedTempFile::new().unwrap();
        let recorder = Recorder::new(file.path(), 48000, 0).unwrap();
        assert_eq!(recorder.channels(), 1);
    }

    #[test]
    fn test_duration_counts_frames_not_samples() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), 1000, 4).unwrap();

        recorder.write_buffer(&[0.25; 4000]).unwrap();

        assert_eq!(recorder.frames_written(), 1000);
        assert!((recorder.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_frame_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        let mut recorder = Recorder::new(file.path(), 1000, 2).unwrap();

        assert!(recorder.write_buffer(&[0.0; 3]).is_err());
        assert_eq!(recorder.frames_written(), 0);
    }

    #[test]
    fn test_stereo_ramp_reads_back() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();

        let ramp: Vec<f32> = (0..500).map(|i| i as f32 / 250.0 - 1.0).collect();
        let block: Vec<f32> = ramp.iter().flat_map(|&s| [s, s]).collect();
        {
            let mut recorder = Recorder::new(&path, 44100, 2).unwrap();
            recorder.write_buffer(&block).unwrap();
            recorder.finalize().unwrap();
        }

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(
            reader.spec(),
            WavSpec {
                channels: 2,
                sample_rate: 44100,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            }
        );

        let samples: Vec<f32> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, block);
    }
}
