// src/delivery.rs

use std::fmt::Write;

use crate::audio::OutputFormat;

/// Prefix put in front of every downloaded file name
pub const DOWNLOAD_PREFIX: &str = "trimmed_";

/// How a clip is handed to the browser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Played in the page's audio element
    Inline,
    /// Saved as a file
    Attachment,
}

/// `trimmed_<original>.mp3`; the original name keeps its own extension
pub fn download_file_name(original_file_name: &str, format: OutputFormat) -> String {
    format!(
        "{}{}.{}",
        DOWNLOAD_PREFIX,
        original_file_name,
        format.extension()
    )
}

/// Build a `Content-Disposition` value for a clip
///
/// Non-ASCII and quoting characters are replaced in the plain `filename`
/// and carried exactly in an RFC 5987 `filename*` parameter.
pub fn content_disposition(disposition: Disposition, file_name: &str) -> String {
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };

    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if fallback == file_name {
        return format!("{}; filename=\"{}\"", kind, fallback);
    }

    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        fallback,
        percent_encode(file_name)
    )
}

/// Percent-encode everything outside RFC 5987 `attr-char`
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || matches!(byte, b'!' | b'#' | b'$' | b'&' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~');
        if keep {
            encoded.push(byte as char);
        } else {
            let _ = write!(encoded, "%{:02X}", byte);
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_file_name() {
        assert_eq!(
            download_file_name("song.wav", OutputFormat::Mp3),
            "trimmed_song.wav.mp3"
        );
        assert_eq!(
            download_file_name("x.mp3", OutputFormat::Mp3),
            "trimmed_x.mp3.mp3"
        );
    }

    #[test]
    fn test_ascii_disposition() {
        assert_eq!(
            content_disposition(Disposition::Attachment, "trimmed_song.wav.mp3"),
            "attachment; filename=\"trimmed_song.wav.mp3\""
        );
        assert_eq!(
            content_disposition(Disposition::Inline, "trimmed_a b.mp3"),
            "inline; filename=\"trimmed_a b.mp3\""
        );
    }

    #[test]
    fn test_unicode_disposition() {
        let header = content_disposition(Disposition::Attachment, "trimmed_bài hát.mp3");
        assert_eq!(
            header,
            "attachment; filename=\"trimmed_b_i h_t.mp3\"; filename*=UTF-8''trimmed_b%C3%A0i%20h%C3%A1t.mp3"
        );
    }

    #[test]
    fn test_quotes_are_neutralised() {
        let header = content_disposition(Disposition::Attachment, "a\"b.mp3");
        assert!(header.starts_with("attachment; filename=\"a_b.mp3\"; filename*=UTF-8''a%22b.mp3"));
    }
}
