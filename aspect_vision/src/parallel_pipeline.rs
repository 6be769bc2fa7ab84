// THEORY:
// The ratio pipeline is a scatter/gather over the manifest. Each entry is an
// independent job: read the header, divide width by height, look the label up in
// the palette. Nothing is shared between jobs except the read-only palette and
// the extractor, both behind an `Arc`.
//
// Shape of the pool:
// 1.  **Dispatcher**: a single task drains the submission channel and deals tasks
//     round-robin onto one channel per worker.
// 2.  **Workers**: exactly `parallelism` tasks, each handling its queue in order.
//     The header read is blocking file I/O, so it runs on tokio's blocking pool;
//     a worker awaits it before taking its next task, which caps concurrent reads
//     at `parallelism`.
// 3.  **Answers**: every task carries a oneshot sender. The caller joins all the
//     receivers, which is the single barrier before layout.
//
// Failure policy is skip-and-log: an unreadable image becomes a warning and the
// batch carries on. A label without a palette entry is a bug upstream and fails
// the whole batch. Cancellation is cooperative: workers check a watch flag before
// each task and answer `Cancelled` instead of reading.

use crate::core_modules::dimensions::DimensionExtractor;
use crate::core_modules::layout::RatioSample;
use crate::core_modules::manifest::ManifestEntry;
use crate::core_modules::palette::Palette;
use crate::error::{AspectError, AspectResult};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What a worker reports back for one entry. Recoverable errors (see
/// [`AspectError::is_recoverable`]) drop the entry; anything else aborts the batch.
pub type TaskOutcome = AspectResult<RatioSample>;

pub struct RatioTask {
    pub entry: ManifestEntry,
    pub result_sender: oneshot::Sender<TaskOutcome>,
}

/// Samples gathered from one pass over the manifest, in completion order.
#[derive(Debug, Default)]
pub struct RatioBatch {
    pub samples: Vec<RatioSample>,
    pub warnings: Vec<AspectError>,
}

pub struct RatioWorkerPool {
    task_sender: mpsc::UnboundedSender<RatioTask>,
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl RatioWorkerPool {
    pub fn new(
        parallelism: usize,
        extractor: Arc<dyn DimensionExtractor>,
        palette: Arc<Palette>,
        cancel: watch::Receiver<bool>,
    ) -> AspectResult<Self> {
        if parallelism == 0 {
            return Err(AspectError::InvalidParallelism);
        }

        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<RatioTask>();
        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..parallelism)
            .map(|_| mpsc::unbounded_channel::<RatioTask>())
            .unzip();

        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if let Err(mpsc::error::SendError(task)) = worker_senders[worker_idx].send(task) {
                    let _ = task.result_sender.send(Err(AspectError::WorkerPool(format!(
                        "worker {worker_idx} stopped"
                    ))));
                }
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        let mut workers = Vec::with_capacity(parallelism);
        for (worker_id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let extractor = Arc::clone(&extractor);
            let palette = Arc::clone(&palette);
            let cancel = cancel.clone();

            let worker = tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    let outcome = if *cancel.borrow() {
                        Err(AspectError::Cancelled)
                    } else {
                        Self::process_entry(worker_id, &extractor, &palette, task.entry).await
                    };
                    let _ = task.result_sender.send(outcome);
                }
            });

            workers.push(worker);
        }

        Ok(Self {
            task_sender,
            dispatcher,
            workers,
        })
    }

    async fn process_entry(
        worker_id: usize,
        extractor: &Arc<dyn DimensionExtractor>,
        palette: &Palette,
        entry: ManifestEntry,
    ) -> TaskOutcome {
        let Some(color) = palette.get(&entry.label) else {
            return Err(AspectError::MissingPaletteEntry {
                label: entry.label.to_string(),
            });
        };

        let extractor = Arc::clone(extractor);
        let path = entry.path.clone();
        match tokio::task::spawn_blocking(move || extractor.extract(&path)).await {
            Ok(Ok(dims)) => {
                debug!(
                    worker_id,
                    path = %entry.path.display(),
                    width = dims.width,
                    height = dims.height,
                    "read image header"
                );
                Ok(RatioSample {
                    ratio: dims.aspect_ratio(),
                    color,
                })
            }
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(AspectError::UnreadableImage {
                path: entry.path,
                reason: format!("header read did not complete: {join_err}"),
            }),
        }
    }

    /// Queues one entry. The receiver resolves once a worker has handled it.
    pub fn submit(&self, entry: ManifestEntry) -> AspectResult<oneshot::Receiver<TaskOutcome>> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(RatioTask {
                entry,
                result_sender,
            })
            .map_err(|_| {
                AspectError::WorkerPool("failed to send task to worker pool".to_string())
            })?;
        Ok(result_receiver)
    }

    /// Submits every entry and waits for all of them.
    pub async fn process_entries(&self, entries: Vec<ManifestEntry>) -> AspectResult<RatioBatch> {
        let receivers = entries
            .into_iter()
            .map(|entry| self.submit(entry))
            .collect::<AspectResult<Vec<_>>>()?;

        let mut batch = RatioBatch::default();
        for outcome in join_all(receivers).await {
            match outcome {
                Ok(Ok(sample)) => batch.samples.push(sample),
                Ok(Err(err)) if err.is_recoverable() => {
                    warn!(%err, "skipping image");
                    batch.warnings.push(err);
                }
                Ok(Err(err)) => return Err(err),
                Err(_) => {
                    return Err(AspectError::WorkerPool(
                        "worker dropped a task without answering".to_string(),
                    ));
                }
            }
        }
        Ok(batch)
    }

    /// Closes the submission channel and waits for the dispatcher and workers to drain.
    pub async fn shutdown(self) {
        let Self {
            task_sender,
            dispatcher,
            workers,
        } = self;
        drop(task_sender);
        let _ = dispatcher.await;
        for worker in workers {
            let _ = worker.await;
        }
    }
}

/// Runs one batch on a fresh pool of `parallelism` workers and tears the pool down.
pub async fn run(
    entries: Vec<ManifestEntry>,
    palette: Arc<Palette>,
    parallelism: usize,
    extractor: Arc<dyn DimensionExtractor>,
    cancel: watch::Receiver<bool>,
) -> AspectResult<RatioBatch> {
    let pool = RatioWorkerPool::new(parallelism, extractor, palette, cancel)?;
    let result = pool.process_entries(entries).await;
    pool.shutdown().await;
    result
}
