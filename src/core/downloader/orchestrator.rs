use std::path::PathBuf;

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::client::Downloader;
use crate::core::archive;
use crate::core::artifact::{Artifact, Category, CompletionHook, Queue};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventSink, LauncherEvent, ProgressKind};

/// An archive to unpack once every requested category has been drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub archive: PathBuf,
    pub destination: PathBuf,
    pub exclude: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFailure {
    pub id: String,
    pub url: String,
    pub error: LauncherError,
}

impl ArtifactFailure {
    fn new(artifact: &Artifact, error: LauncherError) -> Self {
        Self {
            id: artifact.id.clone(),
            url: artifact.url.clone(),
            error,
        }
    }
}

/// Outcome of draining one category. The category counts as drained even
/// when some of its artifacts failed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReport {
    pub category: Category,
    pub attempted: usize,
    pub completed: usize,
    pub failures: Vec<ArtifactFailure>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadReport {
    pub categories: Vec<CategoryReport>,
    pub total_bytes: u64,
    pub transferred_bytes: u64,
    pub extracted: usize,
    pub extraction_failures: Vec<String>,
}

impl DownloadReport {
    pub fn failure_count(&self) -> usize {
        self.categories.iter().map(|c| c.failures.len()).sum()
    }

    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Messages from in-flight fetches to the coordinator, which alone owns
/// the aggregate counters.
enum Signal {
    Chunk(u64),
    Resize { expected: u64, reported: u64 },
    Failed { id: String, message: String },
}

/// Drains the four category queues with bounded concurrency.
pub struct DownloadOrchestrator {
    downloader: Downloader,
    events: EventSink,
    assets: Queue,
    libraries: Queue,
    files: Queue,
    java: Queue,
    backlog: Vec<ExtractionJob>,
    transferred: u64,
    total: u64,
}

impl DownloadOrchestrator {
    pub fn new(downloader: Downloader, events: EventSink) -> Self {
        Self {
            downloader,
            events,
            assets: Queue::new(),
            libraries: Queue::new(),
            files: Queue::new(),
            java: Queue::new(),
            backlog: Vec::new(),
            transferred: 0,
            total: 0,
        }
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn queue(&self, category: Category) -> &Queue {
        match category {
            Category::Assets => &self.assets,
            Category::Libraries => &self.libraries,
            Category::Files => &self.files,
            Category::Java => &self.java,
        }
    }

    pub fn queue_mut(&mut self, category: Category) -> &mut Queue {
        match category {
            Category::Assets => &mut self.assets,
            Category::Libraries => &mut self.libraries,
            Category::Files => &mut self.files,
            Category::Java => &mut self.java,
        }
    }

    pub fn enqueue(&mut self, category: Category, artifact: Artifact) {
        self.queue_mut(category).push(artifact);
    }

    pub fn set_callback(&mut self, category: Category, callback: CompletionHook) {
        self.queue_mut(category).set_callback(callback);
    }

    pub fn queue_extraction(&mut self, job: ExtractionJob) {
        self.backlog.push(job);
    }

    pub fn pending_extractions(&self) -> usize {
        self.backlog.len()
    }

    /// Bytes transferred during the last [`process`](Self::process) call.
    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Expected bytes across the categories of the last `process` call.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Drain the named categories, each with its own concurrency limit, then
    /// run the extraction backlog and emit a single `Complete` event.
    pub async fn process(&mut self, requests: &[(Category, usize)]) -> DownloadReport {
        self.process_with(requests, |_| {}).await
    }

    /// Like [`process`](Self::process), calling `before_extract` with the
    /// backlog size once the downloads are done and before any extraction
    /// starts. Not called when the backlog is empty.
    pub async fn process_with<F>(&mut self, requests: &[(Category, usize)], before_extract: F) -> DownloadReport
    where
        F: FnOnce(usize),
    {
        let mut total = 0u64;
        let mut work = Vec::with_capacity(requests.len());
        for &(category, limit) in requests {
            let queue = self.queue(category);
            total += queue.total_size();
            work.push((
                category,
                limit.max(1),
                queue.artifacts().to_vec(),
                queue.callback().cloned(),
            ));
        }
        info!(
            "Processing download queues {:?}: {} bytes expected",
            requests.iter().map(|(c, _)| c.as_str()).collect::<Vec<_>>(),
            total
        );

        let (tx, mut rx) = mpsc::unbounded_channel();
        let drains: Vec<_> = work
            .into_iter()
            .map(|(category, limit, artifacts, callback)| {
                drain_category(
                    self.downloader.clone(),
                    category,
                    limit,
                    artifacts,
                    callback,
                    tx.clone(),
                )
            })
            .collect();
        drop(tx);

        let events = self.events.clone();
        let coordinator = async move {
            let mut transferred = 0u64;
            let mut total = total;
            while let Some(signal) = rx.recv().await {
                match signal {
                    Signal::Chunk(n) => {
                        transferred += n;
                        events.emit(LauncherEvent::progress(
                            ProgressKind::Download,
                            transferred,
                            total.max(transferred),
                        ));
                    }
                    Signal::Resize { expected, reported } => {
                        total = total.saturating_sub(expected).saturating_add(reported);
                    }
                    Signal::Failed { id, message } => {
                        events.emit(LauncherEvent::Error {
                            context: id,
                            message,
                        });
                    }
                }
            }
            (transferred, total)
        };

        let (categories, (transferred, total)) = tokio::join!(join_all(drains), coordinator);
        self.transferred = transferred;
        self.total = total;

        for &(category, _) in requests {
            self.queue_mut(category).clear();
        }

        let mut report = DownloadReport {
            categories,
            total_bytes: total,
            transferred_bytes: transferred,
            ..DownloadReport::default()
        };

        if !self.backlog.is_empty() {
            before_extract(self.backlog.len());
            self.run_backlog(&mut report).await;
        }

        info!(
            "Download queues drained: {} of {} bytes, {} failures",
            transferred,
            total,
            report.failure_count()
        );
        self.events.emit(LauncherEvent::Complete);
        report
    }

    async fn run_backlog(&mut self, report: &mut DownloadReport) {
        let jobs = std::mem::take(&mut self.backlog);
        let count = jobs.len() as u64;
        for (index, job) in jobs.into_iter().enumerate() {
            let archive_path = job.archive.clone();
            let result = tokio::task::spawn_blocking(move || {
                archive::extract_zip(&job.archive, &job.destination, &job.exclude)
            })
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))
            .and_then(|r| r);

            match result {
                Ok(summary) => {
                    debug!("Extracted {} files from {:?}", summary.files, archive_path);
                    report.extracted += 1;
                }
                Err(err) => {
                    error!("Failed to extract {:?}: {}", archive_path, err);
                    report
                        .extraction_failures
                        .push(archive_path.display().to_string());
                }
            }
            self.events.emit(LauncherEvent::progress(
                ProgressKind::Extract,
                index as u64 + 1,
                count,
            ));
        }
    }
}

async fn drain_category(
    downloader: Downloader,
    category: Category,
    limit: usize,
    artifacts: Vec<Artifact>,
    callback: Option<CompletionHook>,
    tx: mpsc::UnboundedSender<Signal>,
) -> CategoryReport {
    let attempted = artifacts.len();
    debug!(
        "Draining {} queue: {} artifacts, concurrency={}",
        category, attempted, limit
    );

    let failures: Vec<ArtifactFailure> = stream::iter(artifacts)
        .map(|artifact| {
            let downloader = &downloader;
            let callback = callback.clone();
            let tx = &tx;
            async move { fetch_artifact(downloader, artifact, callback, tx).await }
        })
        .buffer_unordered(limit)
        .filter_map(|outcome| async move { outcome.err() })
        .collect()
        .await;

    if !failures.is_empty() {
        warn!(
            "{} queue finished with {} of {} artifacts failed",
            category,
            failures.len(),
            attempted
        );
    }

    CategoryReport {
        category,
        attempted,
        completed: attempted - failures.len(),
        failures,
    }
}

async fn fetch_artifact(
    downloader: &Downloader,
    artifact: Artifact,
    callback: Option<CompletionHook>,
    tx: &mpsc::UnboundedSender<Signal>,
) -> Result<(), ArtifactFailure> {
    let fail = |error: LauncherError| {
        error!("Failed to download {}: {}", artifact.id, error);
        let _ = tx.send(Signal::Failed {
            id: artifact.id.clone(),
            message: error.to_string(),
        });
        ArtifactFailure::new(&artifact, error)
    };

    let outcome = match downloader
        .fetch_to_file(&artifact.url, &artifact.path, |n| {
            let _ = tx.send(Signal::Chunk(n));
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => return Err(fail(err)),
    };

    let reported = outcome.content_length.unwrap_or(outcome.bytes_written);
    if reported != artifact.size {
        warn!(
            "Got {} bytes for {}: expected {}",
            reported, artifact.id, artifact.size
        );
        let _ = tx.send(Signal::Resize {
            expected: artifact.size,
            reported,
        });

        if let Some(hash) = artifact.hash.clone() {
            let path = artifact.path.clone();
            match blocking(move || hash.verify(&path)).await {
                Ok(()) => warn!(
                    "Hashes match for {}, byte mismatch is an issue in the distribution index",
                    artifact.id
                ),
                Err(err) => {
                    error!("Hashes do not match, {} may be corrupted", artifact.id);
                    return Err(fail(err));
                }
            }
        }
    }

    if let Some(callback) = callback {
        let target = artifact.clone();
        if let Err(err) = blocking(move || (*callback)(&target)).await {
            return Err(fail(err));
        }
    }

    Ok(())
}

async fn blocking<T, F>(f: F) -> LauncherResult<T>
where
    F: FnOnce() -> LauncherResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
}
