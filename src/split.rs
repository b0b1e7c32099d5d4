// CSV splitter: one output file per data record, each holding the header
// line followed by that record. The files feed the batch uploader.

use crate::error::{ClientError, Result};
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PROGRESS_EVERY: usize = 1000;

/// Output name for the `n`th record (1-based).
pub fn document_file_name(n: usize) -> String {
    format!("document_{n:05}.txt")
}

/// Split one CSV file into `output_dir`, returning how many documents were
/// written.
pub fn split_csv_file(csv_path: &Path, output_dir: &Path) -> Result<usize> {
    fs::create_dir_all(output_dir).map_err(|e| ClientError::io(output_dir, e))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(csv_path)?;
    let header = reader.headers()?.clone();
    if header.is_empty() {
        return Err(ClientError::InvalidArgument(format!(
            "'{}' has no header row",
            csv_path.display()
        )));
    }

    let mut written = 0;
    for record in reader.records() {
        let record = record?;
        written += 1;
        write_document(&output_dir.join(document_file_name(written)), &header, &record)?;
        if written % PROGRESS_EVERY == 0 {
            info!("Processed {} documents...", written);
        }
    }
    Ok(written)
}

fn write_document(path: &Path, header: &StringRecord, record: &StringRecord) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_path(path)?;
    writer.write_record(header)?;
    writer.write_record(record)?;
    writer.flush().map_err(|e| ClientError::io(path, e))?;
    Ok(())
}

/// Per-file result of splitting a folder.
#[derive(Debug)]
pub struct SplitOutcome {
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub result: Result<usize>,
}

/// Everything `split_input` did.
#[derive(Debug, Default)]
pub struct SplitReport {
    pub files: Vec<SplitOutcome>,
}

impl SplitReport {
    pub fn total_documents(&self) -> usize {
        self.files.iter().filter_map(|f| f.result.as_ref().ok()).sum()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| f.result.is_err()).count()
    }
}

/// Resolve `input` (a `.csv` file, or a folder searched with `pattern`)
/// to the list of CSV files to split.
pub fn csv_inputs(input: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        return Err(ClientError::InvalidArgument(format!(
            "input path '{}' does not exist",
            input.display()
        )));
    }

    if input.is_file() {
        let is_csv = input
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ClientError::InvalidArgument(format!(
                "'{}' is not a CSV file",
                input.display()
            )));
        }
        return Ok(vec![input.to_path_buf()]);
    }

    let pattern = Pattern::new(pattern)
        .map_err(|e| ClientError::InvalidArgument(format!("invalid pattern '{pattern}': {e}")))?;
    let mut found = Vec::new();
    for entry in fs::read_dir(input).map_err(|e| ClientError::io(input, e))? {
        let path = entry.map_err(|e| ClientError::io(input, e))?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| pattern.matches(n));
        if path.is_file() && matches {
            found.push(path);
        }
    }
    found.sort();

    if found.is_empty() {
        return Err(ClientError::InvalidArgument(format!(
            "no CSV files found in '{}' matching pattern '{}'",
            input.display(),
            pattern
        )));
    }
    Ok(found)
}

/// Split every CSV under `input`. With several inputs each one gets its own
/// sub-directory named after the file stem. A failing file is recorded and
/// the rest are still processed.
pub fn split_input(input: &Path, output_dir: &Path, pattern: &str) -> Result<SplitReport> {
    let inputs = csv_inputs(input, pattern)?;
    let nested = inputs.len() > 1;

    let mut report = SplitReport::default();
    for source in inputs {
        let target = match (nested, source.file_stem()) {
            (true, Some(stem)) => output_dir.join(stem),
            _ => output_dir.to_path_buf(),
        };
        info!("Splitting '{}'...", source.display());
        let result = split_csv_file(&source, &target);
        if let Err(e) = &result {
            warn!("Error processing '{}': {}", source.display(), e);
        }
        report.files.push(SplitOutcome {
            source,
            output_dir: target,
            result,
        });
    }
    Ok(report)
}
