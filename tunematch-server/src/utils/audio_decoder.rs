//! Audio Decoding Utilities
//!
//! Decode audio files to mono f32 PCM with symphonia and resample with rubato.

use anyhow::{Context, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Duration in seconds
    pub duration_seconds: f64,
}

/// Decode audio file to mono f32 PCM samples
///
/// **Algorithm:**
/// 1. Probe the container using the file extension as a hint
/// 2. Pick the first track with a real codec
/// 3. Decode every packet of that track, averaging channels to mono
///
/// Corrupt packets are skipped; I/O and container errors abort.
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio file: {}", file_path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => all_samples.extend(mix_to_mono(&decoded)),
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(path = %file_path.display(), error = %e, "Skipping corrupt packet");
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to decode packet in: {}", file_path.display())
                })
            }
        }
    }

    let duration_seconds = all_samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        path = %file_path.display(),
        total_samples = all_samples.len(),
        sample_rate,
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels: channel_count,
        duration_seconds,
    })
}

fn mix_to_mono(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::U8(buf) => average_channels(&**buf),
        AudioBufferRef::U16(buf) => average_channels(&**buf),
        AudioBufferRef::U24(buf) => average_channels(&**buf),
        AudioBufferRef::U32(buf) => average_channels(&**buf),
        AudioBufferRef::S8(buf) => average_channels(&**buf),
        AudioBufferRef::S16(buf) => average_channels(&**buf),
        AudioBufferRef::S24(buf) => average_channels(&**buf),
        AudioBufferRef::S32(buf) => average_channels(&**buf),
        AudioBufferRef::F32(buf) => average_channels(&**buf),
        AudioBufferRef::F64(buf) => average_channels(&**buf),
    }
}

fn average_channels<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count().max(1);
    let num_frames = buf.frames();
    let mut mono = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        mono.push(sum / num_channels as f32);
    }

    mono
}

/// Resample mono samples to `target_rate`
///
/// Single pass over the whole signal with a 256-tap sinc filter.
pub fn resample_mono(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = target_rate as f64 / source_rate as f64;
    let num_frames = samples.len();

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, num_frames, 1)
        .context("Failed to create rubato resampler")?;

    let input = vec![samples];
    let mut output = resampler
        .process(&input, None)
        .context("Rubato resampling failed")?;

    tracing::debug!(
        "Resampled {} frames ({} Hz) → {} frames ({} Hz)",
        num_frames,
        source_rate,
        output[0].len(),
        target_rate
    );

    Ok(output.swap_remove(0))
}
