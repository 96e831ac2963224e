//! deanimate — replace an animated image with a still first frame.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use deanimator::Animation;

/// Detect animation in an image and write a still first-frame version.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Animated input image (GIF, PNG/APNG, or WebP).
    input: PathBuf,

    /// Destination for the still version. GIF inputs are written as PNG.
    output: PathBuf,

    /// Report the verdict without writing the output file.
    #[arg(long)]
    detect_only: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // buffer once so detection and extraction each see the full stream
    let data = fs::read(&args.input)
        .with_context(|| format!("unable to read {}", args.input.display()))?;

    let (verdict, format) = deanimator::is_animated(&data[..])
        .with_context(|| format!("unable to determine animation state for {}", args.input.display()))?;
    match verdict {
        Animation::Animated => println!("{}: animated {format}", args.input.display()),
        Animation::Still => println!("{}: still {format}", args.input.display()),
        Animation::Inconclusive => {
            println!("{}: {format}, truncated before a verdict", args.input.display());
        }
    }
    if args.detect_only {
        return Ok(());
    }

    let mut out = Vec::new();
    deanimator::render_first_frame(&data[..], &mut out)
        .with_context(|| format!("unable to render first frame from {}", args.input.display()))?;
    fs::write(&args.output, &out)
        .with_context(|| format!("unable to write {}", args.output.display()))?;
    println!("deanimated version written to {}", args.output.display());

    Ok(())
}
