// Batched document upload.
//
// Files are partitioned into contiguous batches of a fixed size and sent
// one multipart request per batch, strictly in order. A failed batch is
// logged and recorded in the summary; the run moves on to the next one.
// Only configuration and authentication errors stop a run early.
//
// Pacing between batches goes through the `Pacer` trait.

use crate::api::ApiClient;
use crate::discovery::{collection_folders, collection_name_for, discover_documents, match_collection};
use crate::error::{ClientError, Result};
use crate::models::{Collection, UploadOptions, UploadResponse};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(1);

/// Something that accepts a batch of files for a collection.
pub trait BatchSink {
    fn upload_batch(
        &mut self,
        collection_id: &str,
        files: &[PathBuf],
        options: &UploadOptions,
    ) -> Result<Option<UploadResponse>>;
}

impl BatchSink for ApiClient {
    fn upload_batch(
        &mut self,
        collection_id: &str,
        files: &[PathBuf],
        options: &UploadOptions,
    ) -> Result<Option<UploadResponse>> {
        self.upload_documents(collection_id, files, options)
    }
}

/// Rate limiting hook called after every batch and before every retry.
pub trait Pacer {
    fn pause(&mut self);
}

/// Sleep for a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Pacer for FixedDelay {
    fn pause(&mut self) {
        if !self.0.is_zero() {
            thread::sleep(self.0);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&mut self) {}
}

/// A contiguous slice of the file list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Batch<'a> {
    /// Zero-based position of this batch.
    pub index: usize,
    pub total: usize,
    /// Offset of the first file in the full list.
    pub start: usize,
    pub files: &'a [PathBuf],
}

impl Batch<'_> {
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// One-based range of files covered, for display.
    pub fn file_range(&self) -> (usize, usize) {
        (self.start + 1, self.start + self.files.len())
    }
}

pub fn batch_count(file_count: usize, batch_size: NonZeroUsize) -> usize {
    file_count.div_ceil(batch_size.get())
}

/// Split `files` into ordered, disjoint batches of at most `batch_size`.
pub fn partition(files: &[PathBuf], batch_size: NonZeroUsize) -> impl Iterator<Item = Batch<'_>> {
    let total = batch_count(files.len(), batch_size);
    files
        .chunks(batch_size.get())
        .enumerate()
        .map(move |(index, chunk)| Batch {
            index,
            total,
            start: index * batch_size.get(),
            files: chunk,
        })
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub batch_size: NonZeroUsize,
    /// Extra attempts for a failed batch. Zero means log and move on.
    pub max_retries: u32,
    pub options: UploadOptions,
}

impl Default for UploadConfig {
    fn default() -> Self {
        UploadConfig {
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            max_retries: 0,
            options: UploadOptions::default(),
        }
    }
}

/// What happened to one batch, handed to the reporter as the run goes.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub number: usize,
    pub total: usize,
    pub first_file: usize,
    pub last_file: usize,
    pub error: Option<String>,
}

impl BatchReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFailure {
    pub batch: usize,
    pub files: Vec<PathBuf>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSummary {
    pub collection_id: String,
    pub batches_total: usize,
    pub batches_succeeded: usize,
    pub files_attempted: usize,
    pub files_uploaded: usize,
    pub failures: Vec<BatchFailure>,
}

impl UploadSummary {
    pub fn batches_failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

type Reporter<'a> = Box<dyn FnMut(&BatchReport) + 'a>;

/// Drives a file list through a [`BatchSink`] one batch at a time.
pub struct BatchUploader<'a, S, P> {
    sink: &'a mut S,
    pacer: P,
    config: UploadConfig,
    reporter: Option<Reporter<'a>>,
}

impl<'a, S: BatchSink, P: Pacer> BatchUploader<'a, S, P> {
    pub fn new(sink: &'a mut S, pacer: P, config: UploadConfig) -> Self {
        BatchUploader {
            sink,
            pacer,
            config,
            reporter: None,
        }
    }

    /// Called once per batch with its outcome.
    pub fn with_reporter(mut self, reporter: impl FnMut(&BatchReport) + 'a) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Upload `files` to `collection_id`. Per-batch failures end up in the
    /// summary; only fatal errors are returned as `Err`.
    pub fn run(&mut self, collection_id: &str, files: &[PathBuf]) -> Result<UploadSummary> {
        let total = batch_count(files.len(), self.config.batch_size);
        info!(
            "Uploading {} documents to collection {} in {} batches of up to {}",
            files.len(),
            collection_id,
            total,
            self.config.batch_size
        );

        let mut summary = UploadSummary {
            collection_id: collection_id.to_string(),
            batches_total: total,
            files_attempted: files.len(),
            ..UploadSummary::default()
        };

        for batch in partition(files, self.config.batch_size) {
            let (first, last) = batch.file_range();
            info!("Uploading batch {}/{} (files {}-{})", batch.number(), total, first, last);

            let error = match self.upload_with_retries(collection_id, &batch)? {
                Ok(()) => {
                    summary.batches_succeeded += 1;
                    summary.files_uploaded += batch.files.len();
                    None
                }
                Err(reason) => {
                    error!("Batch {}/{} failed: {}", batch.number(), total, reason);
                    summary.failures.push(BatchFailure {
                        batch: batch.number(),
                        files: batch.files.to_vec(),
                        reason: reason.clone(),
                    });
                    Some(reason)
                }
            };

            if let Some(report) = self.reporter.as_mut() {
                report(&BatchReport {
                    number: batch.number(),
                    total,
                    first_file: first,
                    last_file: last,
                    error,
                });
            }

            self.pacer.pause();
        }

        Ok(summary)
    }

    /// Outer `Err` is fatal for the run; inner `Err` carries the reason the
    /// batch failed after all attempts.
    fn upload_with_retries(
        &mut self,
        collection_id: &str,
        batch: &Batch<'_>,
    ) -> Result<std::result::Result<(), String>> {
        let mut reason = String::new();
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                self.pacer.pause();
                warn!(
                    "Retrying batch {} (attempt {}/{})",
                    batch.number(),
                    attempt + 1,
                    self.config.max_retries + 1
                );
            }

            reason = match self
                .sink
                .upload_batch(collection_id, batch.files, &self.config.options)
            {
                Ok(Some(response)) if !response.is_rejected() => return Ok(Ok(())),
                Ok(Some(response)) => response
                    .message
                    .unwrap_or_else(|| "server reported the upload as unsuccessful".into()),
                Ok(None) => "request rejected by server".into(),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => e.to_string(),
            };
        }
        Ok(Err(reason))
    }
}

/// A local folder paired with the collection its files go to.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderTarget {
    pub folder: PathBuf,
    pub collection: Collection,
}

/// Result of an upload across several folders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub uploads: Vec<UploadSummary>,
    pub skipped_folders: Vec<PathBuf>,
}

impl RunSummary {
    pub fn files_attempted(&self) -> usize {
        self.uploads.iter().map(|u| u.files_attempted).sum()
    }

    pub fn files_uploaded(&self) -> usize {
        self.uploads.iter().map(|u| u.files_uploaded).sum()
    }

    pub fn batches_failed(&self) -> usize {
        self.uploads.iter().map(UploadSummary::batches_failed).sum()
    }

    /// Collections that received at least one batch.
    pub fn collections_touched(&self) -> usize {
        self.uploads.iter().filter(|u| u.batches_total > 0).count()
    }
}

/// Pair each sub-folder of `root` with its collection by name. Folders
/// without a collection are created when `create_missing` is set, and
/// skipped otherwise.
pub fn resolve_folder_targets(
    client: &mut ApiClient,
    root: &Path,
    prefix: Option<&str>,
    create_missing: bool,
) -> Result<(Vec<FolderTarget>, Vec<PathBuf>)> {
    let folders = collection_folders(root)?;
    // Without the listing every folder would look unmatched, and
    // `create_missing` would duplicate existing collections.
    let Some(mut collections) = client.list_collections()? else {
        return Err(ClientError::RequestFailed("could not list collections".into()));
    };

    let mut targets = Vec::new();
    let mut skipped = Vec::new();
    for folder in folders {
        let Some(name) = collection_name_for(&folder, prefix) else {
            warn!("Skipping '{}': folder name is not valid UTF-8", folder.display());
            skipped.push(folder);
            continue;
        };

        if let Some(found) = match_collection(&name, &collections) {
            targets.push(FolderTarget {
                folder,
                collection: found.clone(),
            });
            continue;
        }

        if !create_missing {
            warn!("Skipping '{}': no collection named '{}'", folder.display(), name);
            skipped.push(folder);
            continue;
        }

        match client.create_collection(&name, None)? {
            Some(created) => {
                info!("Created collection '{}' ({})", created.name, created.uuid);
                collections.push(created.clone());
                targets.push(FolderTarget {
                    folder,
                    collection: created,
                });
            }
            None => {
                warn!("Skipping '{}': could not create collection '{}'", folder.display(), name);
                skipped.push(folder);
            }
        }
    }
    Ok((targets, skipped))
}

/// Upload the matching documents of every target folder, in order.
pub fn upload_folders<S: BatchSink, P: Pacer>(
    uploader: &mut BatchUploader<'_, S, P>,
    targets: &[FolderTarget],
    pattern: &str,
) -> Result<RunSummary> {
    let mut run = RunSummary::default();
    for target in targets {
        let files = match discover_documents(&target.folder, pattern) {
            Ok(files) => files,
            Err(e) => {
                warn!("Skipping '{}': {}", target.folder.display(), e);
                run.skipped_folders.push(target.folder.clone());
                continue;
            }
        };
        info!(
            "Folder '{}' → collection '{}' ({} documents)",
            target.folder.display(),
            target.collection.name,
            files.len()
        );
        run.uploads.push(uploader.run(&target.collection.uuid, &files)?);
    }
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn files(n: usize) -> Vec<PathBuf> {
        (1..=n)
            .map(|i| PathBuf::from(format!("document_{i:05}.txt")))
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn ok_response() -> UploadResponse {
        UploadResponse {
            success: Some(true),
            message: None,
            added_chunk_ids: vec!["c".into()],
            extra: Map::new(),
        }
    }

    /// Records every batch it receives; fails the call numbers listed in
    /// `fail_calls` (1-based).
    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<Vec<PathBuf>>,
        fail_calls: Vec<usize>,
        fatal_on: Option<usize>,
    }

    impl BatchSink for RecordingSink {
        fn upload_batch(
            &mut self,
            _collection_id: &str,
            files: &[PathBuf],
            _options: &UploadOptions,
        ) -> Result<Option<UploadResponse>> {
            self.calls.push(files.to_vec());
            let call = self.calls.len();
            if self.fatal_on == Some(call) {
                return Err(ClientError::Authentication("token revoked".into()));
            }
            if self.fail_calls.contains(&call) {
                return Err(ClientError::InvalidArgument(format!("boom {call}")));
            }
            Ok(Some(ok_response()))
        }
    }

    #[derive(Clone, Default)]
    struct CountingPacer(Rc<RefCell<usize>>);

    impl Pacer for CountingPacer {
        fn pause(&mut self) {
            *self.0.borrow_mut() += 1;
        }
    }

    fn config(batch: usize) -> UploadConfig {
        UploadConfig {
            batch_size: size(batch),
            ..UploadConfig::default()
        }
    }

    #[test]
    fn partition_covers_list_in_order() {
        for (n, b) in [(0, 3), (1, 1), (5, 2), (6, 3), (7, 50), (100, 7)] {
            let list = files(n);
            let batches: Vec<_> = partition(&list, size(b)).collect();
            assert_eq!(batches.len(), batch_count(n, size(b)));
            assert_eq!(batches.len(), (n + b - 1) / b);

            let rejoined: Vec<PathBuf> = batches.iter().flat_map(|x| x.files.to_vec()).collect();
            assert_eq!(rejoined, list);
            for (i, batch) in batches.iter().enumerate() {
                assert_eq!(batch.index, i);
                assert_eq!(batch.start, i * b);
                assert!(!batch.files.is_empty() && batch.files.len() <= b);
            }
        }
    }

    #[test]
    fn all_batches_succeed() {
        let list = files(5);
        let mut sink = RecordingSink::default();
        let pacer = CountingPacer::default();
        let pauses = pacer.0.clone();

        let summary = BatchUploader::new(&mut sink, pacer, config(2))
            .run("c1", &list)
            .unwrap();

        assert_eq!(sink.calls.len(), 3);
        assert_eq!(sink.calls[2], vec![PathBuf::from("document_00005.txt")]);
        assert_eq!(summary.batches_total, 3);
        assert_eq!(summary.batches_succeeded, 3);
        assert_eq!(summary.files_uploaded, 5);
        assert!(summary.is_complete());
        // Paced after every batch, including the last.
        assert_eq!(*pauses.borrow(), 3);
    }

    #[test]
    fn failed_batch_does_not_stop_the_run() {
        let list = files(6);
        let mut sink = RecordingSink {
            fail_calls: vec![1],
            ..RecordingSink::default()
        };
        let reports = RefCell::new(Vec::new());

        let summary = BatchUploader::new(&mut sink, NoDelay, config(2))
            .with_reporter(|r| reports.borrow_mut().push(r.clone()))
            .run("c1", &list)
            .unwrap();

        assert_eq!(sink.calls.len(), 3);
        assert_eq!(summary.batches_succeeded, 2);
        assert_eq!(summary.files_uploaded, 4);
        assert_eq!(summary.files_attempted, 6);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].batch, 1);
        assert_eq!(summary.failures[0].files, list[0..2].to_vec());

        let reports = reports.into_inner();
        assert_eq!(reports.len(), 3);
        assert!(!reports[0].succeeded());
        assert!(reports[1].succeeded() && reports[2].succeeded());
        assert_eq!((reports[1].first_file, reports[1].last_file), (3, 4));
    }

    #[test]
    fn empty_list_reports_success_without_calls() {
        let mut sink = RecordingSink::default();
        let pacer = CountingPacer::default();
        let pauses = pacer.0.clone();
        let summary = BatchUploader::new(&mut sink, pacer, config(10)).run("c1", &[]).unwrap();
        assert!(sink.calls.is_empty());
        assert_eq!(summary.batches_total, 0);
        assert!(summary.is_complete());
        assert_eq!(*pauses.borrow(), 0);
    }

    #[test]
    fn oversized_batch_is_a_single_call() {
        let list = files(3);
        let mut sink = RecordingSink::default();
        BatchUploader::new(&mut sink, NoDelay, config(50)).run("c1", &list).unwrap();
        assert_eq!(sink.calls, vec![list]);
    }

    #[test]
    fn retries_are_opt_in() {
        let list = files(2);
        let mut sink = RecordingSink {
            fail_calls: vec![1],
            ..RecordingSink::default()
        };
        let cfg = UploadConfig {
            max_retries: 2,
            ..config(2)
        };
        let summary = BatchUploader::new(&mut sink, NoDelay, cfg).run("c1", &list).unwrap();
        assert_eq!(sink.calls.len(), 2);
        assert!(summary.is_complete());
    }

    #[test]
    fn fatal_error_aborts() {
        let list = files(4);
        let mut sink = RecordingSink {
            fatal_on: Some(2),
            ..RecordingSink::default()
        };
        let err = BatchUploader::new(&mut sink, NoDelay, config(1)).run("c1", &list).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(sink.calls.len(), 2);
    }

    #[test]
    fn rejected_response_counts_as_failure() {
        struct Rejecting;
        impl BatchSink for Rejecting {
            fn upload_batch(
                &mut self,
                _: &str,
                _: &[PathBuf],
                _: &UploadOptions,
            ) -> Result<Option<UploadResponse>> {
                Ok(Some(UploadResponse {
                    success: Some(false),
                    message: Some("unsupported file type".into()),
                    added_chunk_ids: vec![],
                    extra: Map::new(),
                }))
            }
        }

        let summary = BatchUploader::new(&mut Rejecting, NoDelay, config(5))
            .run("c1", &files(2))
            .unwrap();
        assert_eq!(summary.failures[0].reason, "unsupported file type");
    }

    #[test]
    fn run_summary_totals() {
        let run = RunSummary {
            uploads: vec![
                UploadSummary {
                    batches_total: 2,
                    files_attempted: 3,
                    files_uploaded: 1,
                    failures: vec![BatchFailure {
                        batch: 1,
                        files: vec![],
                        reason: "x".into(),
                    }],
                    ..UploadSummary::default()
                },
                UploadSummary::default(),
            ],
            skipped_folders: vec![PathBuf::from("misc")],
        };
        assert_eq!(run.files_attempted(), 3);
        assert_eq!(run.files_uploaded(), 1);
        assert_eq!(run.batches_failed(), 1);
        assert_eq!(run.collections_touched(), 1);
    }
}
