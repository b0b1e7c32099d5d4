// Terminal output helpers used by the binary: pretty JSON, coloured status
// lines and the batch progress bar.

use crate::upload::{BatchReport, RunSummary, UploadSummary};
use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// Pretty-print a response, or say that nothing came back.
pub fn print_response<T: Serialize>(response: Option<&T>) {
    let Some(response) = response else {
        println!("No response received.");
        return;
    };
    match serde_json::to_string_pretty(response) {
        Ok(text) => println!("{text}"),
        Err(e) => failure(&format!("Could not render response: {e}")),
    }
}

pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn failure(message: &str) {
    eprintln!("{}", message.red());
}

/// Progress bar counting batches.
pub fn batch_progress(total: usize) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} batches {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// One tally line per batch, e.g. `✓ Batch 2/7 uploaded (files 51-100)`.
pub fn batch_line(report: &BatchReport) -> String {
    match &report.error {
        None => format!(
            "{} Batch {}/{} uploaded (files {}-{})",
            "✓".green(),
            report.number,
            report.total,
            report.first_file,
            report.last_file
        ),
        Some(reason) => format!(
            "{} Batch {}/{} failed (files {}-{}): {}",
            "✗".red(),
            report.number,
            report.total,
            report.first_file,
            report.last_file,
            reason
        ),
    }
}

pub fn print_upload_summary(summary: &UploadSummary) {
    println!();
    println!(
        "Collection {}: {}/{} documents uploaded in {}/{} batches",
        summary.collection_id,
        summary.files_uploaded,
        summary.files_attempted,
        summary.batches_succeeded,
        summary.batches_total
    );
    for failed in &summary.failures {
        println!("  {} batch {}: {}", "✗".red(), failed.batch, failed.reason);
    }
}

pub fn print_run_summary(run: &RunSummary) {
    for upload in &run.uploads {
        print_upload_summary(upload);
    }
    println!();
    println!(
        "Uploaded {}/{} documents across {} collections ({} failed batches)",
        run.files_uploaded(),
        run.files_attempted(),
        run.collections_touched(),
        run.batches_failed()
    );
    for folder in &run.skipped_folders {
        println!("  {} skipped '{}'", "-".yellow(), folder.display());
    }
}
