// src/audio/mod.rs

pub mod decoder;
pub mod encoder;
pub mod trim;
pub mod types;
pub mod waveform;

// Re-export commonly used items
pub use decoder::{decode_audio, decode_audio_file};
pub use encoder::encode_mp3;
pub use trim::{slice_audio, trim, PcmSlice};
pub use types::{
    AudioAsset, AudioInfo, OutputFormat, SelectionRange, SourceFormat, TrimmedClip, WaveformPeaks,
};
pub use waveform::{compute_peaks, render_svg, WaveformStyle};
