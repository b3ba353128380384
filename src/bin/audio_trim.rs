// src/bin/audio_trim.rs

use anyhow::Context;
use audio_trimmer_lib::audio::{decode_audio_file, trim, AudioInfo, SelectionRange};
use audio_trimmer_lib::delivery::download_file_name;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Command-line tool for trimming audio files to MP3
#[derive(Parser, Debug)]
#[command(name = "audio-trim")]
#[command(about = "Trim an audio file to a time range and save it as MP3", long_about = None)]
struct Args {
    /// Input audio file (MP3, WAV, OGG or FLAC)
    #[arg(short, long)]
    input: PathBuf,

    /// Output MP3 file (defaults to trimmed_<input>.mp3 next to the input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start time in seconds
    #[arg(short, long)]
    start: f64,

    /// End time in seconds
    #[arg(short, long)]
    end: f64,

    /// Show detailed information
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    audio_trimmer_lib::init_tracing();
    let args = Args::parse();

    println!("🎵 Audio Trimmer");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let range = SelectionRange::new(args.start, args.end)?;

    // Step 1: Decode audio
    println!("\n🔊 Decoding audio...");
    let start_time = std::time::Instant::now();
    let audio = decode_audio_file(&args.input)
        .with_context(|| format!("could not load {}", args.input.display()))?;

    let input_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let info = AudioInfo::describe(&input_name, &audio);

    println!("\n📊 Input File: {}", args.input.display());
    println!("   Duration: {:.2} seconds ({:.2} minutes)",
        info.duration_seconds, info.duration_seconds / 60.0);
    println!("   Sample Rate: {} Hz", info.sample_rate);
    println!("   Channels: {}", info.channels);
    println!("   Format: {}", info.format);

    if args.verbose {
        println!("   Loaded {} samples ({:.2} MB)",
            audio.samples().len(),
            (audio.samples().len() * 4) as f64 / 1_048_576.0);
        println!("   Decode time: {:.2}s", start_time.elapsed().as_secs_f64());
    }

    // Step 2: Trim and encode
    println!("\n✂️  Trim Range:");
    println!("   Start: {:.2}s", range.start_seconds);
    println!("   End: {:.2}s", range.end_seconds);
    println!("   Duration: {:.2}s", range.length_seconds());

    let encode_start = std::time::Instant::now();
    let clip = trim(&audio, &range)?;

    if args.verbose {
        println!("   Encoded {} bytes in {:.2}s",
            clip.bytes.len(), encode_start.elapsed().as_secs_f64());
    }

    // Step 3: Save
    let output = args.output.unwrap_or_else(|| {
        args.input
            .with_file_name(download_file_name(&input_name, clip.format))
    });
    std::fs::write(&output, &clip.bytes)
        .with_context(|| format!("could not write {}", output.display()))?;
    info!(output = %output.display(), bytes = clip.bytes.len(), "clip written");

    println!("\n✅ Done! Output saved to: {}", output.display());
    println!("   Total time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}
