// src/audio/encoder.rs

use mp3lame_encoder::{Bitrate, Builder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};

use crate::error::{AudioError, Result};

/// Bitrate every clip is written at
pub const OUTPUT_BITRATE: Bitrate = Bitrate::Kbps128;

/// Worst-case size of the final flush, per the LAME documentation
const FLUSH_BUFFER_SIZE: usize = 7200;

/// Encode interleaved PCM samples to an MP3 byte stream
///
/// Mono input stays mono. Anything with two or more channels is written as
/// stereo from its first two channels. Empty input is valid and produces
/// just the encoder's flush frames.
///
/// # Example
/// ```
/// use audio_trimmer_lib::audio::encode_mp3;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // One second of silence
/// let mp3 = encode_mp3(&vec![0.0; 44100], 44100, 1)?;
/// assert!(!mp3.is_empty());
/// # Ok(())
/// # }
/// ```
pub fn encode_mp3(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    if channels == 0 {
        return Err(AudioError::EncodeFailed("no channels to encode".to_string()));
    }
    let output_channels: u8 = if channels == 1 { 1 } else { 2 };

    let mut builder = Builder::new()
        .ok_or_else(|| AudioError::EncodeFailed("could not allocate LAME encoder".to_string()))?;
    builder
        .set_num_channels(output_channels)
        .map_err(|e| AudioError::EncodeFailed(format!("channels: {:?}", e)))?;
    builder
        .set_sample_rate(sample_rate)
        .map_err(|e| AudioError::EncodeFailed(format!("sample rate {}: {:?}", sample_rate, e)))?;
    builder
        .set_brate(OUTPUT_BITRATE)
        .map_err(|e| AudioError::EncodeFailed(format!("bitrate: {:?}", e)))?;
    builder
        .set_quality(Quality::Good)
        .map_err(|e| AudioError::EncodeFailed(format!("quality: {:?}", e)))?;
    let mut encoder = builder
        .build()
        .map_err(|e| AudioError::EncodeFailed(format!("init: {:?}", e)))?;

    let pcm = to_pcm16(samples, channels as usize, output_channels as usize);
    let frames = pcm.len() / output_channels as usize;

    let mut output = Vec::new();
    if frames > 0 {
        output.reserve(mp3lame_encoder::max_required_buffer_size(frames));
        let written = if output_channels == 1 {
            encoder.encode_to_vec(MonoPcm(&pcm), &mut output)
        } else {
            encoder.encode_to_vec(InterleavedPcm(&pcm), &mut output)
        };
        written.map_err(|e| AudioError::EncodeFailed(format!("encode: {:?}", e)))?;
    }

    output.reserve(FLUSH_BUFFER_SIZE);
    encoder
        .flush_to_vec::<FlushNoGap>(&mut output)
        .map_err(|e| AudioError::EncodeFailed(format!("flush: {:?}", e)))?;

    Ok(output)
}

/// Convert float samples to 16-bit PCM, keeping at most `output_channels` per frame
fn to_pcm16(samples: &[f32], channels: usize, output_channels: usize) -> Vec<i16> {
    let to_i16 = |s: f32| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;

    if channels == output_channels {
        return samples.iter().map(|&s| to_i16(s)).collect();
    }

    samples
        .chunks_exact(channels)
        .flat_map(|frame| frame[..output_channels].iter().map(|&s| to_i16(s)))
        .collect()
}
