pub mod audio;
pub mod config;
pub mod delivery;
pub mod error;
pub mod selection;
pub mod server;
pub mod session;

#[cfg(test)]
mod test_utils;

// Re-export for convenience
pub use audio::*;
pub use config::ServerConfig;
pub use error::{AudioError, Result};
pub use session::{Session, SessionError, SessionStore};

/// Install the tracing subscriber shared by every binary
///
/// `RUST_LOG` wins when set; otherwise this crate logs at info.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("audio_trimmer_lib=info,audio_trimmer=info,audio_trim=info")),
        )
        .try_init();
}

/// Run the web server until it is shut down
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    server::serve(config).await
}
