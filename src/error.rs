use thiserror::Error;

/// All possible errors that can occur while decoding, trimming or encoding audio
#[derive(Debug, Error)]
pub enum AudioError {
    /// Failed to open or read an audio file from disk
    #[error("Failed to open audio file '{path}': {source}")]
    FileOpen {
        path: String,
        source: std::io::Error,
    },

    /// The payload is not one of the accepted formats, or it is corrupt
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Error occurred while encoding the trimmed clip to MP3
    #[error("MP3 encoding failed: {0}")]
    EncodeFailed(String),

    /// Malformed selection (e.g., start > end, negative or non-finite values)
    /// or one that runs past the end of the audio
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenient Result type that uses our AudioError
pub type Result<T> = std::result::Result<T, AudioError>;
