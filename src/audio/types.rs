use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::{AudioError, Result};

/// Container formats accepted on upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Mp3,
    Wav,
    Ogg,
    Flac,
}

impl SourceFormat {
    /// Every accepted format, in the order shown to users
    pub const ALL: [SourceFormat; 4] = [
        SourceFormat::Mp3,
        SourceFormat::Wav,
        SourceFormat::Ogg,
        SourceFormat::Flac,
    ];

    /// Look up the format from a file name's extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        Self::ALL
            .into_iter()
            .find(|format| extension.eq_ignore_ascii_case(format.extension()))
    }

    pub fn extension(self) -> &'static str {
        match self {
            SourceFormat::Mp3 => "mp3",
            SourceFormat::Wav => "wav",
            SourceFormat::Ogg => "ogg",
            SourceFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// A decoded upload held in memory as PCM samples
///
/// Samples are stored interleaved: [L, R, L, R, ...] for stereo
/// or [M, M, M, ...] for mono, where each sample is a 32-bit float
/// in the range [-1.0, 1.0]. Immutable once built.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    raw_bytes: Arc<[u8]>,
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
    format: SourceFormat,
}

impl AudioAsset {
    /// Assemble an asset from already-decoded samples
    ///
    /// `channels` and `sample_rate` must be non-zero; a trailing partial
    /// frame is dropped so the buffer is always frame aligned.
    pub fn new(
        raw_bytes: Arc<[u8]>,
        mut samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        format: SourceFormat,
    ) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::UnsupportedFormat(format!(
                "invalid stream layout: {} Hz, {} channels",
                sample_rate, channels
            )));
        }
        let aligned = samples.len() - samples.len() % channels as usize;
        samples.truncate(aligned);

        Ok(Self {
            raw_bytes,
            samples,
            sample_rate,
            channels,
            format,
        })
    }

    /// The bytes exactly as uploaded
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Interleaved PCM samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz (e.g., 44100, 48000)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// Get the number of audio frames (one sample per channel)
    ///
    /// For stereo: 1000 samples = 500 frames
    /// For mono: 1000 samples = 1000 frames
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration = frames / sample_rate
    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Summary of a loaded upload, sent to the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Name the file was uploaded with
    pub file_name: String,

    /// Total duration in seconds
    pub duration_seconds: f64,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Container the upload arrived in
    pub format: SourceFormat,
}

impl AudioInfo {
    pub fn describe(file_name: &str, asset: &AudioAsset) -> Self {
        Self {
            file_name: file_name.to_string(),
            duration_seconds: asset.duration_seconds(),
            sample_rate: asset.sample_rate(),
            channels: asset.channels(),
            format: asset.format(),
        }
    }
}

/// A [start, end) window over an asset, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRange {
    /// Start time in seconds (>= 0)
    pub start_seconds: f64,

    /// End time in seconds (>= start_seconds)
    pub end_seconds: f64,
}

impl SelectionRange {
    /// Create a range with validation
    ///
    /// Equal bounds are allowed and describe an empty selection.
    pub fn new(start_seconds: f64, end_seconds: f64) -> Result<Self> {
        if !start_seconds.is_finite() || !end_seconds.is_finite() {
            return Err(AudioError::InvalidRange(format!(
                "bounds must be finite: {} to {}",
                start_seconds, end_seconds
            )));
        }

        if start_seconds < 0.0 {
            return Err(AudioError::InvalidRange(format!(
                "start time cannot be negative: {}",
                start_seconds
            )));
        }

        if end_seconds < start_seconds {
            return Err(AudioError::InvalidRange(format!(
                "end time ({}) must not precede start time ({})",
                end_seconds, start_seconds
            )));
        }

        Ok(Self {
            start_seconds,
            end_seconds,
        })
    }

    /// The whole of an asset
    pub fn full(duration_seconds: f64) -> Self {
        Self {
            start_seconds: 0.0,
            end_seconds: duration_seconds,
        }
    }

    /// Force both bounds into [0, duration] and order them
    pub fn clamped(start_seconds: f64, end_seconds: f64, duration_seconds: f64) -> Self {
        let start = start_seconds.clamp(0.0, duration_seconds);
        let end = end_seconds.clamp(0.0, duration_seconds);
        Self {
            start_seconds: start.min(end),
            end_seconds: start.max(end),
        }
    }

    /// Length of the selection in seconds
    pub fn length_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    pub fn is_empty(&self) -> bool {
        self.end_seconds <= self.start_seconds
    }
}

/// Output container of every trimmed clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    Mp3,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "audio/mp3",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp3 => "mp3",
        }
    }
}

/// An encoded, standalone copy of a selection
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedClip {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
}

/// Min/max amplitude per display column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformPeaks {
    pub min_peaks: Vec<f32>,
    pub max_peaks: Vec<f32>,
    pub num_peaks: usize,
    pub duration_seconds: f64,
    pub channels: u16,
    pub sample_rate: u32,
}
