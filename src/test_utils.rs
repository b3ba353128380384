//! Fixtures shared by the unit tests: synthetic tones and in-memory WAV files.

use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::sync::Arc;

use crate::audio::types::{AudioAsset, SourceFormat};

/// Interleaved 440 Hz sine at half amplitude, identical on every channel
pub fn sine_samples(duration_seconds: f64, sample_rate: u32, channels: u16) -> Vec<f32> {
    let frames = (duration_seconds * sample_rate as f64) as usize;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let value = (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5;
        for _ in 0..channels {
            samples.push(value);
        }
    }
    samples
}

/// Build an asset directly, skipping the decoder
pub fn sine_asset(duration_seconds: f64, sample_rate: u32, channels: u16) -> AudioAsset {
    AudioAsset::new(
        Arc::from(Vec::new()),
        sine_samples(duration_seconds, sample_rate, channels),
        sample_rate,
        channels,
        SourceFormat::Wav,
    )
    .expect("valid fixture layout")
}

/// Encode samples as a 16-bit PCM WAV file held in memory
pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).expect("create WAV writer");
        for &sample in samples {
            writer
                .write_sample((sample * i16::MAX as f32) as i16)
                .expect("write sample");
        }
        writer.finalize().expect("finalize WAV");
    }
    cursor.into_inner()
}

/// A sine tone as WAV bytes
pub fn sine_wav(duration_seconds: f64, sample_rate: u32, channels: u16) -> Vec<u8> {
    wav_bytes(
        &sine_samples(duration_seconds, sample_rate, channels),
        sample_rate,
        channels,
    )
}
