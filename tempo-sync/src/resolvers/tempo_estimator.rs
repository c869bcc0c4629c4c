//! Tempo estimation from encoded audio
//!
//! Uses symphonia for format-agnostic decoding (MP3 previews in practice,
//! WAV in tests) and a plain onset-autocorrelation estimator:
//!
//! 1. Decode to mono f32 PCM
//! 2. Frame energy (window 1024, hop 512)
//! 3. Onset envelope = half-wave rectified energy flux
//! 4. Autocorrelate the envelope over lags covering `min_bpm..=max_bpm`
//! 5. Strongest lag, refined by parabolic interpolation, gives the period
//!
//! The search range is deliberately narrower than one octave wide on each
//! side of typical tempos so half/double-time lags fall outside it.

use super::ResolverError;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

const WINDOW_SIZE: usize = 1024;
const HOP_SIZE: usize = 512;

/// Opaque tempo analysis step
///
/// Synchronous and CPU-bound; callers run it on a blocking thread.
pub trait TempoEstimator: Send + Sync {
    /// Estimator name for logs
    fn name(&self) -> &'static str;

    /// Estimate BPM from encoded audio bytes
    fn estimate(&self, audio: &[u8]) -> Result<f32, ResolverError>;
}

/// Decoded preview audio
#[derive(Debug)]
pub struct DecodedPreview {
    /// Mono samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

/// Energy-flux onset detector + autocorrelation tempo estimator
#[derive(Debug, Clone)]
pub struct OnsetTempoEstimator {
    min_bpm: f32,
    max_bpm: f32,
    max_seconds: f32,
}

impl Default for OnsetTempoEstimator {
    fn default() -> Self {
        Self {
            min_bpm: 70.0,
            max_bpm: 180.0,
            max_seconds: 30.0,
        }
    }
}

impl OnsetTempoEstimator {
    pub fn new(min_bpm: f32, max_bpm: f32, max_seconds: f32) -> Self {
        Self {
            min_bpm,
            max_bpm,
            max_seconds,
        }
    }

    /// Estimate BPM from mono PCM
    pub fn estimate_from_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<f32, ResolverError> {
        if sample_rate == 0 {
            return Err(ResolverError::Analysis("Sample rate is zero".to_string()));
        }

        let max_samples = (self.max_seconds * sample_rate as f32) as usize;
        let samples = &samples[..samples.len().min(max_samples)];

        let mut envelope = onset_envelope(samples);

        let frame_rate = sample_rate as f32 / HOP_SIZE as f32;
        let lag_min = ((60.0 * frame_rate / self.max_bpm).floor() as usize).max(1);
        let lag_max = (60.0 * frame_rate / self.min_bpm).ceil() as usize;

        if envelope.len() < lag_max * 4 {
            return Err(ResolverError::Analysis(format!(
                "Audio too short for tempo analysis ({} frames)",
                envelope.len()
            )));
        }

        if envelope.iter().all(|v| *v <= f32::EPSILON) {
            return Err(ResolverError::Analysis("No onsets detected".to_string()));
        }

        let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
        for value in envelope.iter_mut() {
            *value -= mean;
        }

        // r[k] holds the autocorrelation at lag (lag_min + k)
        let correlations: Vec<f32> = (lag_min..=lag_max)
            .map(|lag| autocorrelation(&envelope, lag))
            .collect();

        let (best_index, best_value) = correlations
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, v)| if v > best.1 { (i, v) } else { best });

        if best_value <= 0.0 {
            return Err(ResolverError::Analysis("No periodic onset pattern".to_string()));
        }

        let offset = if best_index > 0 && best_index + 1 < correlations.len() {
            parabolic_offset(
                correlations[best_index - 1],
                best_value,
                correlations[best_index + 1],
            )
        } else {
            0.0
        };

        let lag = (lag_min + best_index) as f32 + offset;
        let bpm = 60.0 * frame_rate / lag;

        debug!(
            lag,
            bpm,
            frames = envelope.len(),
            "Tempo estimate"
        );

        Ok(bpm)
    }
}

impl TempoEstimator for OnsetTempoEstimator {
    fn name(&self) -> &'static str {
        "onset_autocorrelation"
    }

    fn estimate(&self, audio: &[u8]) -> Result<f32, ResolverError> {
        let preview = decode_preview(audio, self.max_seconds)?;
        self.estimate_from_samples(&preview.samples, preview.sample_rate)
    }
}

/// Decode encoded audio to mono f32 PCM, stopping after `max_seconds`
pub fn decode_preview(audio: &[u8], max_seconds: f32) -> Result<DecodedPreview, ResolverError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(audio.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ResolverError::Decode(format!("Failed to probe preview: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ResolverError::Decode("No audio track in preview".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ResolverError::Decode("Sample rate unknown".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ResolverError::Decode(format!("Failed to create decoder: {}", e)))?;

    let max_samples = (max_seconds * sample_rate as f32) as usize;
    let mut samples: Vec<f32> = Vec::new();

    while samples.len() < max_samples {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(ResolverError::Decode(format!("Error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frame; skip it and keep going
                debug!("Skipping undecodable packet: {}", e);
                continue;
            }
            Err(e) => {
                return Err(ResolverError::Decode(format!("Failed to decode packet: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);

        samples.extend(
            buffer
                .samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if samples.is_empty() {
        return Err(ResolverError::Decode("Preview contained no audio".to_string()));
    }

    Ok(DecodedPreview {
        samples,
        sample_rate,
    })
}

/// Half-wave rectified frame-energy flux
fn onset_envelope(samples: &[f32]) -> Vec<f32> {
    if samples.len() < WINDOW_SIZE {
        return Vec::new();
    }

    let frame_count = (samples.len() - WINDOW_SIZE) / HOP_SIZE + 1;
    let energies: Vec<f32> = (0..frame_count)
        .map(|i| {
            let start = i * HOP_SIZE;
            samples[start..start + WINDOW_SIZE].iter().map(|s| s * s).sum()
        })
        .collect();

    let mut envelope = Vec::with_capacity(frame_count);
    envelope.push(0.0);
    envelope.extend(energies.windows(2).map(|pair| (pair[1] - pair[0]).max(0.0)));
    envelope
}

fn autocorrelation(envelope: &[f32], lag: usize) -> f32 {
    if lag >= envelope.len() {
        return 0.0;
    }
    let n = envelope.len() - lag;
    let sum: f32 = envelope[..n]
        .iter()
        .zip(&envelope[lag..])
        .map(|(a, b)| a * b)
        .sum();
    sum / n as f32
}

/// Vertex offset of the parabola through three neighbouring points, in [-0.5, 0.5]
fn parabolic_offset(left: f32, centre: f32, right: f32) -> f32 {
    let denominator = left - 2.0 * centre + right;
    if denominator.abs() < f32::EPSILON {
        return 0.0;
    }
    (0.5 * (left - right) / denominator).clamp(-0.5, 0.5)
}
