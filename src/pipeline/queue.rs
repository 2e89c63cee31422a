//! Background ingestion queue.
//!
//! Jobs run strictly one at a time, in submission order, on a single worker
//! thread. Submitting never blocks; there is no backpressure.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PixRecallError, Result};

use super::IngestionPipeline;

/// A queued unit of work.
#[derive(Debug)]
enum Job {
    Image(PathBuf),
    Folder(PathBuf),
}

/// Totals accumulated by the worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Jobs executed.
    pub jobs: usize,
    /// Images persisted.
    pub images_succeeded: usize,
    /// Images that failed, including jobs that failed outright.
    pub images_failed: usize,
}

/// Single-worker FIFO in front of an [`IngestionPipeline`].
///
/// # Example
///
/// ```rust,ignore
/// let queue = app.ingest_queue()?;
/// queue.submit_folder("/photos/2024")?;
/// queue.submit_image("/photos/new.jpg")?;
/// let stats = queue.shutdown()?;
/// ```
pub struct IngestQueue {
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<QueueStats>>,
}

impl IngestQueue {
    /// Spawns the worker thread.
    pub fn start(pipeline: Arc<IngestionPipeline>) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();

        let worker = thread::Builder::new()
            .name("pixrecall-ingest".into())
            .spawn(move || {
                let mut stats = QueueStats::default();
                while let Ok(job) = receiver.recv() {
                    stats.jobs += 1;
                    debug!(?job, "Running ingest job");
                    match job {
                        Job::Image(path) => match pipeline.process_image(&path) {
                            Ok(_) => stats.images_succeeded += 1,
                            Err(err) => {
                                warn!(path = %path.display(), error = %err, "Queued image failed");
                                stats.images_failed += 1;
                            }
                        },
                        Job::Folder(root) => match pipeline.process_folder(&root) {
                            Ok(report) => {
                                stats.images_succeeded += report.succeeded;
                                stats.images_failed += report.failed;
                            }
                            Err(err) => {
                                warn!(root = %root.display(), error = %err, "Queued folder failed");
                                stats.images_failed += 1;
                            }
                        },
                    }
                }
                stats
            })?;

        info!("Ingest queue started");
        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    fn submit(&self, job: Job) -> Result<()> {
        let sender = self.sender.as_ref().ok_or_else(closed)?;
        sender.send(job).map_err(|_| closed())
    }

    /// Queues one image.
    pub fn submit_image(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.submit(Job::Image(path.into()))
    }

    /// Queues a recursive folder ingest.
    pub fn submit_folder(&self, root: impl Into<PathBuf>) -> Result<()> {
        self.submit(Job::Folder(root.into()))
    }

    /// Runs every queued job to completion, then stops the worker.
    pub fn shutdown(mut self) -> Result<QueueStats> {
        let stats = self.finish()?;
        info!(
            jobs = stats.jobs,
            succeeded = stats.images_succeeded,
            failed = stats.images_failed,
            "Ingest queue drained"
        );
        Ok(stats)
    }

    fn finish(&mut self) -> Result<QueueStats> {
        // closing the channel ends the worker loop once it is empty
        self.sender.take();
        match self.worker.take() {
            Some(worker) => worker
                .join()
                .map_err(|_| PixRecallError::Io(io::Error::other("ingest worker panicked"))),
            None => Ok(QueueStats::default()),
        }
    }
}

impl Drop for IngestQueue {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            warn!(error = %err, "Ingest queue stopped uncleanly");
        }
    }
}

fn closed() -> PixRecallError {
    PixRecallError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "ingest queue closed"))
}
