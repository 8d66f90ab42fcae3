//! Audio Test Fixture Generator
//!
//! Writes small WAV files with hound.

use std::path::Path;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 3.0,
            sample_rate: 44100,
            channels: 2,
        }
    }
}

/// Write a WAV whose every channel carries `signal(t)` (t in seconds)
pub fn write_wav(path: &Path, config: &AudioConfig, signal: impl Fn(f64) -> f64) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    let total_frames = (config.duration_seconds * config.sample_rate as f64) as usize;

    for i in 0..total_frames {
        let t = i as f64 / config.sample_rate as f64;
        let value = (signal(t).clamp(-1.0, 1.0) * i16::MAX as f64) as i16;
        for _ in 0..config.channels {
            writer.write_sample(value)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Pure tone at `freq` Hz
pub fn write_sine_wav(path: &Path, config: &AudioConfig, freq: f64) -> anyhow::Result<()> {
    write_wav(path, config, |t| 0.5 * (2.0 * std::f64::consts::PI * freq * t).sin())
}

/// Decaying 1 kHz bursts, one every `period_seconds`
pub fn write_burst_wav(path: &Path, config: &AudioConfig, period_seconds: f64) -> anyhow::Result<()> {
    let burst = 0.02;
    write_wav(path, config, |t| {
        let offset = t % period_seconds;
        if offset < burst {
            0.8 * (1.0 - offset / burst) * (2.0 * std::f64::consts::PI * 1000.0 * t).sin()
        } else {
            0.0
        }
    })
}
