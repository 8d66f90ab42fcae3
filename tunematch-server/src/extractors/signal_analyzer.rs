//! Signal Analyzer
//!
//! Estimates tempo and key of a decoded waveform with plain DSP.
//!
//! # Algorithm
//! 1. Decode to mono f32 (symphonia) and resample to the analysis rate (rubato)
//! 2. Short-time Fourier transform: Hann window, 2048-sample frames, 512 hop
//! 3. Tempo: spectral-flux onset envelope, autocorrelated over 50-220 BPM
//! 4. Key: magnitudes between 80 Hz and 4 kHz folded into a 12-bin chroma,
//!    the strongest pitch class wins
//!
//! Frames are processed one at a time; only the previous frame's log
//! magnitudes and the running chroma sum are kept.

use crate::types::{ExtractionError, PitchClass};
use crate::utils::{decode_audio_file, resample_mono};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::path::Path;
use tracing::debug;

/// Tempo and key estimate for one track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoKey {
    /// Beats per minute, truncated; 0 when no periodicity was found
    pub tempo_bpm: u32,
    pub key: PitchClass,
}

/// Tempo/key estimator
#[derive(Debug, Clone)]
pub struct SignalAnalyzer {
    analysis_sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    min_tempo: f32,
    max_tempo: f32,
    min_chroma_hz: f32,
    max_chroma_hz: f32,
}

impl Default for SignalAnalyzer {
    fn default() -> Self {
        Self::new(22050)
    }
}

impl SignalAnalyzer {
    pub fn new(analysis_sample_rate: u32) -> Self {
        Self {
            analysis_sample_rate,
            frame_size: 2048,
            hop_size: 512,
            min_tempo: 50.0,
            max_tempo: 220.0,
            min_chroma_hz: 80.0,
            max_chroma_hz: 4000.0,
        }
    }

    pub fn analysis_sample_rate(&self) -> u32 {
        self.analysis_sample_rate
    }

    /// Decode, resample and analyze an audio file
    ///
    /// Blocking; call from `spawn_blocking`.
    pub fn analyze_file(&self, path: &Path) -> Result<TempoKey, ExtractionError> {
        let decoded =
            decode_audio_file(path).map_err(|e| ExtractionError::Decode(format!("{:#}", e)))?;

        let samples = resample_mono(decoded.samples, decoded.sample_rate, self.analysis_sample_rate)
            .map_err(|e| ExtractionError::Analysis(format!("{:#}", e)))?;

        Ok(self.analyze_samples(&samples, self.analysis_sample_rate))
    }

    /// Analyze mono samples recorded at `sample_rate`
    pub fn analyze_samples(&self, samples: &[f32], sample_rate: u32) -> TempoKey {
        if sample_rate == 0 || samples.len() < self.frame_size {
            debug!(samples = samples.len(), "Too little audio for tempo/key analysis");
            return TempoKey {
                tempo_bpm: 0,
                key: PitchClass::C,
            };
        }

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.frame_size);
        let mut scratch = vec![Complex::<f32>::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let mut buffer = vec![Complex::<f32>::new(0.0, 0.0); self.frame_size];

        let window: Vec<f32> = (0..self.frame_size)
            .map(|i| {
                0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / self.frame_size as f32).cos())
            })
            .collect();

        let num_bins = self.frame_size / 2 + 1;
        let bin_hz = sample_rate as f32 / self.frame_size as f32;
        let pitch_classes: Vec<Option<usize>> = (0..num_bins)
            .map(|bin| self.pitch_class_of(bin as f32 * bin_hz))
            .collect();

        let mut previous = vec![0.0f32; num_bins];
        let mut current = vec![0.0f32; num_bins];
        let mut chroma = [0.0f64; 12];
        let mut onset_envelope = Vec::new();

        let mut start = 0;
        while start + self.frame_size <= samples.len() {
            let frame = &samples[start..start + self.frame_size];
            for ((slot, &sample), &w) in buffer.iter_mut().zip(frame).zip(&window) {
                *slot = Complex::new(sample * w, 0.0);
            }
            fft.process_with_scratch(&mut buffer, &mut scratch);

            let mut flux = 0.0f32;
            for bin in 0..num_bins {
                let magnitude = buffer[bin].norm();
                if let Some(pc) = pitch_classes[bin] {
                    chroma[pc] += magnitude as f64;
                }
                let log_mag = magnitude.ln_1p();
                flux += (log_mag - previous[bin]).max(0.0);
                current[bin] = log_mag;
            }
            onset_envelope.push(flux);
            std::mem::swap(&mut previous, &mut current);

            start += self.hop_size;
        }

        let tempo = self
            .estimate_tempo(&onset_envelope, sample_rate)
            .map(|bpm| bpm as u32)
            .unwrap_or(0);
        let key = strongest_pitch_class(&chroma);

        debug!(
            frames = onset_envelope.len(),
            tempo_bpm = tempo,
            key = %key,
            "Signal analysis complete"
        );

        TempoKey {
            tempo_bpm: tempo,
            key,
        }
    }

    /// Pitch class (0 = C) of a frequency inside the chroma band
    fn pitch_class_of(&self, freq: f32) -> Option<usize> {
        if freq < self.min_chroma_hz || freq > self.max_chroma_hz {
            return None;
        }
        let semitones_from_a = (12.0 * (freq / 440.0).log2()).round() as i32;
        Some((semitones_from_a + 9).rem_euclid(12) as usize)
    }

    /// Autocorrelation tempo estimate over the onset envelope
    fn estimate_tempo(&self, onset_envelope: &[f32], sample_rate: u32) -> Option<f32> {
        if onset_envelope.len() < 64 {
            return None;
        }

        // Skip the first frame: its flux is measured against silence
        let envelope = &onset_envelope[1..];
        let n = envelope.len();
        let frame_duration = self.hop_size as f32 / sample_rate as f32;

        let min_lag = ((60.0 / (self.max_tempo * frame_duration)).floor() as usize).max(1);
        let max_lag = ((60.0 / (self.min_tempo * frame_duration)).ceil() as usize).min(n / 2);
        if min_lag >= max_lag {
            return None;
        }

        let mean = envelope.iter().sum::<f32>() / n as f32;
        let centered: Vec<f32> = envelope.iter().map(|&x| x - mean).collect();

        let energy: f32 = centered.iter().map(|&x| x * x).sum();
        if energy < 1e-10 {
            return None;
        }

        let corr_at = |lag: usize| -> f32 {
            centered[..n - lag]
                .iter()
                .zip(&centered[lag..])
                .map(|(&a, &b)| a * b)
                .sum::<f32>()
                / energy
        };

        let mut best_lag = min_lag;
        let mut best_corr = f32::NEG_INFINITY;
        for lag in min_lag..=max_lag {
            let corr = corr_at(lag);
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }
        }

        if best_corr < 0.05 {
            return None;
        }

        // Parabolic interpolation around the peak
        let lag = if best_lag > min_lag && best_lag < max_lag {
            let prev = corr_at(best_lag - 1);
            let next = corr_at(best_lag + 1);
            let denom = prev - 2.0 * best_corr + next;
            if denom.abs() > 1e-10 {
                best_lag as f32 + 0.5 * (prev - next) / denom
            } else {
                best_lag as f32
            }
        } else {
            best_lag as f32
        };

        let beat_period = lag * frame_duration;
        if beat_period <= 0.0 {
            return None;
        }
        Some(60.0 / beat_period)
    }
}

/// Argmax over the chroma; the lowest index wins ties, so silence reads as C
fn strongest_pitch_class(chroma: &[f64; 12]) -> PitchClass {
    let mut best = 0;
    for (index, &value) in chroma.iter().enumerate() {
        if value > chroma[best] {
            best = index;
        }
    }
    PitchClass::from_index(best).unwrap_or(PitchClass::C)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 22050;

    /// Short decaying 1 kHz bursts every `period` samples
    fn burst_train(seconds: usize, period: usize) -> Vec<f32> {
        let total = RATE as usize * seconds;
        (0..total)
            .map(|i| {
                let offset = i % period;
                if offset < 512 {
                    let t = offset as f32 / RATE as f32;
                    let decay = 1.0 - offset as f32 / 512.0;
                    0.8 * decay * (2.0 * std::f32::consts::PI * 1000.0 * t).sin()
                } else {
                    0.0
                }
            })
            .collect()
    }

    fn sine(freq: f32, seconds: usize) -> Vec<f32> {
        (0..RATE as usize * seconds)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin())
            .collect()
    }

    #[test]
    fn test_silence_is_zero_tempo_and_c() {
        let analyzer = SignalAnalyzer::default();
        let result = analyzer.analyze_samples(&vec![0.0; RATE as usize * 5], RATE);
        assert_eq!(result.tempo_bpm, 0);
        assert_eq!(result.key, PitchClass::C);
    }

    #[test]
    fn test_short_input_is_zero_tempo_and_c() {
        let analyzer = SignalAnalyzer::default();
        let result = analyzer.analyze_samples(&[0.3; 100], RATE);
        assert_eq!(result, TempoKey { tempo_bpm: 0, key: PitchClass::C });
    }

    #[test]
    fn test_a440_sine_is_key_a() {
        let analyzer = SignalAnalyzer::default();
        let result = analyzer.analyze_samples(&sine(440.0, 3), RATE);
        assert_eq!(result.key, PitchClass::A);
    }

    #[test]
    fn test_burst_train_tempo() {
        // 21 hops between bursts: 60 / (21 * 512 / 22050) ≈ 123 BPM
        let analyzer = SignalAnalyzer::default();
        let result = analyzer.analyze_samples(&burst_train(10, 21 * 512), RATE);
        assert!(
            (118..=128).contains(&result.tempo_bpm),
            "tempo was {}",
            result.tempo_bpm
        );
    }

    #[test]
    fn test_pitch_class_mapping() {
        let analyzer = SignalAnalyzer::default();
        assert_eq!(analyzer.pitch_class_of(440.0), Some(9));
        assert_eq!(analyzer.pitch_class_of(261.63), Some(0));
        assert_eq!(analyzer.pitch_class_of(880.0), Some(9));
        assert_eq!(analyzer.pitch_class_of(40.0), None);
        assert_eq!(analyzer.pitch_class_of(5000.0), None);
    }

    #[test]
    fn test_strongest_pitch_class_first_wins() {
        let mut chroma = [0.0; 12];
        chroma[2] = 1.0;
        chroma[7] = 1.0;
        assert_eq!(strongest_pitch_class(&chroma), PitchClass::D);
    }

    #[test]
    fn test_analyze_missing_file_is_decode_error() {
        let analyzer = SignalAnalyzer::default();
        let result = analyzer.analyze_file(Path::new("/nonexistent/audio.wav"));
        assert!(matches!(result, Err(ExtractionError::Decode(_))));
    }
}
