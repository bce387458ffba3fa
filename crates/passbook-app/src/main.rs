mod queue;

use clap::Parser;
use passbook_core::{OcrAcceleration, OcrOptions, StatementExtractor};
use queue::JobStatus;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "passbook",
    version,
    about = "Convert bank statement PDFs (text or scanned) to spreadsheets"
)]
struct Cli {
    /// Statement PDFs to convert; a file picker opens when omitted
    files: Vec<PathBuf>,

    /// Let the OCR engine use hardware acceleration, falling back to the
    /// unaccelerated path if it fails
    #[arg(long)]
    accelerate: bool,

    /// Keep the extracted raw text next to each output file
    #[arg(long)]
    keep_text: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let files = if cli.files.is_empty() {
        pick_files()
    } else {
        cli.files
    };

    if files.is_empty() {
        eprintln!("No statement selected.");
        return;
    }

    if !passbook_core::extraction::pdftotext::is_available() {
        eprintln!("{}", passbook_core::error::PassbookError::PdftotextNotFound);
        std::process::exit(1);
    }

    let acceleration = if cli.accelerate {
        OcrAcceleration::Enabled
    } else {
        OcrAcceleration::Disabled
    };
    let extractor = StatementExtractor::new(OcrOptions {
        acceleration,
        ..OcrOptions::default()
    });

    let jobs = queue::run(&files, &extractor, cli.keep_text);

    println!();
    println!("Summary:");
    let mut failures = 0;
    for job in &jobs {
        println!("  {}: {}", job.input.display(), job.status);
        if matches!(job.status, JobStatus::Failed { .. }) {
            failures += 1;
        }
    }

    if failures == jobs.len() {
        std::process::exit(1);
    }
}

fn pick_files() -> Vec<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("PDF statements", &["pdf"])
        .set_title("Select bank statement PDFs")
        .pick_files()
        .unwrap_or_default()
}
