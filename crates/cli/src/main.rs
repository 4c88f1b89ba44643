//! CLI tool for extracting embedded spreadsheets and images from PowerPoint files.

mod archive;
mod pipeline;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use embex_core::ExtractionMode;
use pipeline::{run_request, ExtractionRequest, ExtractionSummary};
use std::path::PathBuf;

/// What to extract from every input file.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    /// Embedded Excel workbooks
    Excel,
    /// Picture shapes
    Images,
}

impl From<ModeArg> for ExtractionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Excel => ExtractionMode::Excel,
            ModeArg::Images => ExtractionMode::Images,
        }
    }
}

/// Extract embedded spreadsheets or images from PowerPoint files into a zip.
#[derive(Parser, Debug)]
#[command(name = "embex")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PowerPoint file(s) (.pptx)
    #[arg(required = true)]
    input: Vec<PathBuf>,

    /// What to extract
    #[arg(short, long, value_enum, default_value = "excel")]
    mode: ModeArg,

    /// Output archive (default: pptx_<mode>_output.zip)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not add the slide label column to extracted workbooks
    #[arg(long)]
    no_labels: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let mode = ExtractionMode::from(args.mode);
    let request = ExtractionRequest {
        inputs: args.input.clone(),
        mode,
        labels: !args.no_labels,
        output: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(mode.archive_name())),
    };

    let summary = run_request(&request)?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", json);
    } else {
        report(&summary);
    }

    Ok(())
}

/// Print the result the way the download page shows it.
fn report(summary: &ExtractionSummary) {
    if summary.total == 0 {
        eprintln!("Warning: {}", summary.message());
        return;
    }

    println!("{}", summary.message());
    if let Some(archive) = &summary.archive {
        println!("Archive: {}", archive.display());
    }

    match summary.mode {
        ExtractionMode::Images => {
            println!("Extracted images:");
            for document in &summary.documents {
                for image in &document.images {
                    let name = image
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy())
                        .unwrap_or_default();
                    println!(
                        "  {}/{} ({}, slide {})",
                        summary.mode.subtree(),
                        name,
                        document.source,
                        image.slide
                    );
                }
            }
        }
        ExtractionMode::Excel => {
            for name in &summary.files {
                println!("  {}/{}", summary.mode.subtree(), name);
            }
            if summary.cells_replaced > 0 {
                println!("Replaced {} placeholder cell(s).", summary.cells_replaced);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["embex", "deck.pptx"]).unwrap();
        assert!(matches!(args.mode, ModeArg::Excel));
        assert!(args.output.is_none());
        assert!(!args.no_labels);
    }

    #[test]
    fn test_args_images_mode() {
        let args =
            Args::try_parse_from(["embex", "--mode", "images", "-o", "out.zip", "a.pptx", "b.pptx"])
                .unwrap();
        assert_eq!(ExtractionMode::from(args.mode), ExtractionMode::Images);
        assert_eq!(args.output, Some(PathBuf::from("out.zip")));
        assert_eq!(args.input.len(), 2);
    }

    #[test]
    fn test_args_require_input() {
        assert!(Args::try_parse_from(["embex"]).is_err());
    }
}
