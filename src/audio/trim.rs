// src/audio/trim.rs

use tracing::debug;

use crate::audio::encoder::encode_mp3;
use crate::audio::types::{AudioAsset, OutputFormat, SelectionRange, TrimmedClip};
use crate::error::{AudioError, Result};

/// Borrowed view of a frame-aligned region of an asset's samples
#[derive(Debug, Clone, Copy)]
pub struct PcmSlice<'a> {
    /// Interleaved samples of the region
    pub samples: &'a [f32],
    pub sample_rate: u32,
    pub channels: u16,
    /// Index of the first frame within the asset
    pub start_frame: usize,
}

impl PcmSlice<'_> {
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Whole milliseconds in `seconds`, rounded down
pub fn seconds_to_millis(seconds: f64) -> u64 {
    (seconds * 1000.0).floor() as u64
}

/// Frame index at a millisecond offset, rounded down
pub fn millis_to_frame(millis: u64, sample_rate: u32) -> usize {
    (millis as u128 * sample_rate as u128 / 1000) as usize
}

/// Select the frames covered by `range`
///
/// Both bounds are truncated to whole milliseconds before being turned
/// into frame offsets, so the slice can be up to one millisecond shorter
/// than the requested selection.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use audio_trimmer_lib::audio::{slice_audio, AudioAsset, SelectionRange, SourceFormat};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // 10 seconds of stereo at 44.1kHz
/// let audio = AudioAsset::new(Arc::from(Vec::new()), vec![0.5; 882000], 44100, 2, SourceFormat::Wav)?;
///
/// let slice = slice_audio(&audio, &SelectionRange::new(5.0, 10.0)?)?;
/// assert_eq!(slice.duration_seconds(), 5.0);
/// assert_eq!(slice.channels, 2);
/// # Ok(())
/// # }
/// ```
pub fn slice_audio<'a>(audio: &'a AudioAsset, range: &SelectionRange) -> Result<PcmSlice<'a>> {
    // Re-validate; the range may have been built without SelectionRange::new
    let range = SelectionRange::new(range.start_seconds, range.end_seconds)?;

    let duration = audio.duration_seconds();
    if range.end_seconds > duration {
        return Err(AudioError::InvalidRange(format!(
            "range ({}s to {}s) exceeds audio duration ({}s)",
            range.start_seconds, range.end_seconds, duration
        )));
    }

    let frames = audio.frame_count();
    let start_frame =
        millis_to_frame(seconds_to_millis(range.start_seconds), audio.sample_rate()).min(frames);
    let end_frame =
        millis_to_frame(seconds_to_millis(range.end_seconds), audio.sample_rate()).min(frames);

    let channels = audio.channels() as usize;
    let samples = &audio.samples()[start_frame * channels..end_frame * channels];

    Ok(PcmSlice {
        samples,
        sample_rate: audio.sample_rate(),
        channels: audio.channels(),
        start_frame,
    })
}

/// Cut `range` out of `audio` and re-encode it as a standalone MP3
///
/// The output container is MP3 whatever the upload was. An empty range
/// still produces a valid (silent) stream. The same inputs always
/// produce byte-identical output.
pub fn trim(audio: &AudioAsset, range: &SelectionRange) -> Result<TrimmedClip> {
    let slice = slice_audio(audio, range)?;
    let bytes = encode_mp3(slice.samples, slice.sample_rate, slice.channels)?;

    debug!(
        start_frame = slice.start_frame,
        frames = slice.frame_count(),
        bytes = bytes.len(),
        "trimmed clip encoded"
    );

    Ok(TrimmedClip {
        bytes,
        format: OutputFormat::Mp3,
    })
}
