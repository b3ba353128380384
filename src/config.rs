// src/config.rs

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;

use crate::audio::WaveformStyle;

/// Web server for uploading, previewing and trimming audio files
#[derive(Parser, Debug, Clone)]
#[command(name = "audio-trimmer")]
#[command(about = "Serve the audio trimmer page", long_about = None)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8501)]
    pub port: u16,

    /// Largest accepted upload, in MiB
    #[arg(long, default_value_t = 200)]
    pub max_upload_mb: usize,

    /// Waveform image width in pixels
    #[arg(long, default_value_t = 1200)]
    pub waveform_width: u32,

    /// Waveform image height in pixels
    #[arg(long, default_value_t = 400)]
    pub waveform_height: u32,

    /// Minutes a session may stay idle before its audio is discarded
    #[arg(long, default_value_t = 30)]
    pub session_idle_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8501,
            max_upload_mb: 200,
            waveform_width: 1200,
            waveform_height: 400,
            session_idle_minutes: 30,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_minutes.saturating_mul(60))
    }

    pub fn waveform_style(&self) -> WaveformStyle {
        WaveformStyle {
            width: self.waveform_width,
            height: self.waveform_height,
            ..WaveformStyle::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_flags() {
        let parsed = ServerConfig::parse_from(["audio-trimmer"]);
        let defaults = ServerConfig::default();

        assert_eq!(parsed.socket_addr(), defaults.socket_addr());
        assert_eq!(parsed.max_upload_bytes(), 200 * 1024 * 1024);
        assert_eq!(parsed.waveform_width, defaults.waveform_width);
        assert_eq!(parsed.waveform_height, defaults.waveform_height);
        assert_eq!(parsed.session_idle_timeout(), Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_flags_override() {
        let config = ServerConfig::parse_from([
            "audio-trimmer",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--max-upload-mb",
            "5",
            "--waveform-width",
            "640",
            "--session-idle-minutes",
            "5",
        ]);

        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:9000");
        assert_eq!(config.max_upload_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.waveform_style().width, 640);
        assert_eq!(config.waveform_style().height, 400);
        assert_eq!(config.session_idle_timeout(), Duration::from_secs(300));
    }
}
