use audio_trimmer_lib::ServerConfig;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    audio_trimmer_lib::init_tracing();

    let config = ServerConfig::parse();
    audio_trimmer_lib::run(config).await
}
