// src/audio/decoder.rs

use std::fs;
use std::io::{Cursor, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::types::{AudioAsset, SourceFormat};
use crate::error::{AudioError, Result};

/// Decodes an uploaded payload to PCM samples in memory
///
/// Only `.mp3`, `.wav`, `.ogg` and `.flac` names are accepted; the
/// extension doubles as the probe hint. Anything that cannot be probed
/// or yields no audio is rejected as [`AudioError::UnsupportedFormat`].
///
/// # Example
/// ```no_run
/// use audio_trimmer_lib::audio::decode_audio;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("interview.flac")?;
/// let audio = decode_audio(bytes.into(), "interview.flac")?;
/// println!("Loaded {:.2} seconds of audio", audio.duration_seconds());
/// # Ok(())
/// # }
/// ```
pub fn decode_audio(raw_bytes: Arc<[u8]>, file_name: &str) -> Result<AudioAsset> {
    let format_kind = SourceFormat::from_file_name(file_name).ok_or_else(|| {
        AudioError::UnsupportedFormat(format!(
            "'{}' is not one of: mp3, wav, ogg, flac",
            file_name
        ))
    })?;

    let source = Cursor::new(Arc::clone(&raw_bytes));
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(format_kind.extension());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(format!("failed to probe '{}': {}", file_name, e)))?;

    let mut format = probed.format;

    // Find the default audio track (skip video/subtitle tracks)
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::UnsupportedFormat("no audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(format!("no decoder for track: {}", e)))?;

    let mut samples = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(e) => match read_failure(e) {
                None => break,
                Some(error) => return Err(error),
            },
        };

        // Skip packets from other tracks (e.g., album art)
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(reason)) => {
                skipped_packets += 1;
                debug!(reason, "skipping undecodable packet");
                continue;
            }
            Err(e) => {
                return Err(AudioError::UnsupportedFormat(format!("decode error: {}", e)));
            }
        };

        let spec = *decoded.spec();
        let packet_channels = spec.channels.count() as u16;
        match channels {
            // Some MP3s only reveal their layout once the first packet is decoded
            None => channels = Some(packet_channels),
            Some(known) if known != packet_channels => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "channel count changed mid-stream ({} -> {})",
                    known, packet_channels
                )));
            }
            Some(_) => {}
        }
        sample_rate.get_or_insert(spec.rate);

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if skipped_packets > 0 {
        warn!(file_name, skipped_packets, "some packets could not be decoded");
    }

    let sample_rate = sample_rate
        .ok_or_else(|| AudioError::UnsupportedFormat("sample rate not found".to_string()))?;
    let channels = channels
        .ok_or_else(|| AudioError::UnsupportedFormat("could not determine channel count".to_string()))?;

    let asset = AudioAsset::new(raw_bytes, samples, sample_rate, channels, format_kind)?;
    if asset.frame_count() == 0 {
        return Err(AudioError::UnsupportedFormat(format!(
            "'{}' contains no audio frames",
            file_name
        )));
    }

    debug!(
        file_name,
        sample_rate,
        channels,
        frames = asset.frame_count(),
        "decoded upload"
    );

    Ok(asset)
}

/// Reads a file from disk and decodes it with [`decode_audio`]
pub fn decode_audio_file<P: AsRef<Path>>(path: P) -> Result<AudioAsset> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy().to_string();

    let raw_bytes = fs::read(path).map_err(|e| AudioError::FileOpen {
        path: path_str.clone(),
        source: e,
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or(path_str);

    decode_audio(raw_bytes.into(), &file_name)
}

/// Classify an error from reading the next packet
///
/// `None` is the normal end of the stream. A reset request means the stream
/// changed shape part way through (e.g. chained Ogg) and is rejected rather
/// than returning the frames read so far.
fn read_failure(error: SymphoniaError) -> Option<AudioError> {
    match error {
        SymphoniaError::IoError(e) if e.kind() == ErrorKind::UnexpectedEof => None,
        SymphoniaError::ResetRequired => Some(AudioError::UnsupportedFormat(
            "stream changed parameters mid-way (chained or multiplexed streams are not supported)"
                .to_string(),
        )),
        e => Some(AudioError::UnsupportedFormat(format!("failed to read packet: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sine_samples, sine_wav, wav_bytes};

    #[test]
    fn test_decode_wav_mono() {
        let bytes = sine_wav(10.0, 44100, 1);
        let audio = decode_audio(bytes.into(), "tone.wav").unwrap();

        assert_eq!(audio.sample_rate(), 44100);
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.frame_count(), 441_000);
        assert!((audio.duration_seconds() - 10.0).abs() < 1e-9);
        assert_eq!(audio.format(), SourceFormat::Wav);
    }

    #[test]
    fn test_decode_keeps_stereo_interleaved() {
        // Left channel at +0.5, right at -0.5
        let mut samples = Vec::new();
        for _ in 0..4800 {
            samples.push(0.5);
            samples.push(-0.5);
        }
        let bytes = wav_bytes(&samples, 48000, 2);
        let audio = decode_audio(bytes.into(), "split.WAV").unwrap();

        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.frame_count(), 4800);
        for frame in audio.samples().chunks(2) {
            assert!((frame[0] - 0.5).abs() < 0.001);
            assert!((frame[1] + 0.5).abs() < 0.001);
        }
    }

    #[test]
    fn test_decode_keeps_raw_bytes() {
        let bytes = sine_wav(0.5, 22050, 1);
        let audio = decode_audio(bytes.clone().into(), "tone.wav").unwrap();
        assert_eq!(audio.raw_bytes(), bytes.as_slice());
    }

    #[test]
    fn test_corrupt_mp3_is_rejected() {
        let result = decode_audio(b"this is not audio at all".to_vec().into(), "x.mp3");
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_disallowed_extension_is_rejected() {
        // Valid WAV payload, but the declared name is outside the allow-list
        let bytes = sine_wav(0.5, 44100, 1);
        let result = decode_audio(bytes.into(), "tone.aiff");
        match result {
            Err(AudioError::UnsupportedFormat(message)) => assert!(message.contains("tone.aiff")),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_wav_is_rejected() {
        let bytes = wav_bytes(&[], 44100, 1);
        let result = decode_audio(bytes.into(), "silence.wav");
        assert!(matches!(result, Err(AudioError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_decode_audio_file_reads_from_disk() {
        let temp_path = std::env::temp_dir().join("audio_trimmer_decode_test.wav");
        std::fs::write(&temp_path, wav_bytes(&sine_samples(1.0, 8000, 1), 8000, 1)).unwrap();

        let audio = decode_audio_file(&temp_path).unwrap();
        assert_eq!(audio.frame_count(), 8000);

        std::fs::remove_file(temp_path).ok();
    }

    #[test]
    fn test_decode_audio_file_missing() {
        let result = decode_audio_file("/nonexistent/path/audio.mp3");
        assert!(matches!(result, Err(AudioError::FileOpen { .. })));
    }

    #[test]
    fn test_read_failure_classification() {
        let eof = SymphoniaError::IoError(std::io::Error::new(ErrorKind::UnexpectedEof, "end"));
        assert!(read_failure(eof).is_none());

        assert!(matches!(
            read_failure(SymphoniaError::ResetRequired),
            Some(AudioError::UnsupportedFormat(_))
        ));

        let broken = SymphoniaError::IoError(std::io::Error::new(ErrorKind::Other, "boom"));
        assert!(matches!(read_failure(broken), Some(AudioError::UnsupportedFormat(_))));
    }
}
