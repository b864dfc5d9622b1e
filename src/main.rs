use clap::Parser;
use room_minify::{MinifyConfig, output, pipeline};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "room-minify")]
#[command(version)]
#[command(about = "Shrink a tabletop-session export archive")]
#[command(long_about = "\
Shrink a tabletop-session export archive

Recodes the images embedded in a room export (png/jpg) to lossy WebP,
renames them to content-addressed filenames, rewrites every reference in
__data.json, and recomputes the .token integrity entry. Animated PNGs and
non-image entries pass through untouched.

The output is written next to the input with `_compressed` inserted before
the extension:

  room-minify my-room.zip      →  my-room_compressed.zip

The run is all-or-nothing: any unreadable or unencodable asset aborts the
conversion and no output file is produced.")]
struct Cli {
    /// Input session export archive (zip)
    input: PathBuf,
}

fn main() {
    if let Err(error) = run(&Cli::parse()) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input = std::fs::read(&cli.input)?;
    let output_path = derive_output_path(&cli.input);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        let mut tally = output::SizeTally::default();
        let mut saw_any = false;
        for event in rx {
            tally.record(&event);
            output::print_progress(&event, &tally);
            saw_any = true;
        }
        if saw_any {
            output::finish_progress();
        }
    });

    let result = pipeline::minify_archive(&input, &MinifyConfig::default(), Some(tx));
    // The sender is dropped inside minify_archive; the printer drains and exits.
    printer.join().expect("printer thread panicked");
    let converted = result?;

    std::fs::write(&output_path, &converted)?;
    println!("{}", output::format_summary(input.len(), converted.len(), &output_path));
    Ok(())
}

/// Output path: input with `_compressed` inserted before the extension.
fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_compressed.{ext}"),
        None => format!("{stem}_compressed"),
    };
    input.with_file_name(name)
}
