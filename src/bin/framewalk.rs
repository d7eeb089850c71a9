use std::{io, path::PathBuf};

use clap::Parser;
use colored::Colorize;
use framewalk::{DriverOptions, FfmpegLogLevel};

#[derive(Debug, Parser)]
#[command(
    name = "framewalk",
    version,
    about = "Decode every packet of a media file and print per-frame metadata",
    after_help = "Example:\n  framewalk input.mp4"
)]
struct Cli {
    /// Input media path.
    input: Option<PathBuf>,
}

fn program_name() -> String {
    std::env::args()
        .next()
        .unwrap_or_else(|| "framewalk".to_string())
}

fn main() {
    let cli = Cli::parse();

    let Some(input) = cli.input else {
        println!("usage : {} <input>", program_name());
        return;
    };

    let options = DriverOptions::new().with_ffmpeg_log_level(FfmpegLogLevel::Debug);
    let stdout = io::stdout().lock();

    // Setup failures are reported, not signalled through the exit status.
    if let Err(error) = framewalk::decode_file(&input, &options, stdout) {
        println!("{} {error}", "error:".red().bold());
    }
}
