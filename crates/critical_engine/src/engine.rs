use std::sync::{mpsc, Arc};
use std::thread;

use critical_core::StyleSource;
use engine_logging::{engine_debug, engine_error};
use tokio_util::sync::CancellationToken;

use crate::fetch::StyleFetcher;
use crate::pipeline::{CriticalCssPipeline, PipelineError};
use crate::{EngineEvent, ExtractionError, JobId, JobProgress, Stage};

/// One page to reduce, with the style sources that make up its stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionJob {
    pub html: String,
    pub sources: Vec<StyleSource>,
}

enum EngineCommand {
    Enqueue { job_id: JobId, job: ExtractionJob },
}

/// Runs extraction jobs on a background runtime and reports back through
/// [`EngineEvent`]s. Jobs run concurrently and share nothing but the
/// read-only pipeline.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    shutdown: CancellationToken,
}

impl EngineHandle {
    pub fn new<F>(pipeline: CriticalCssPipeline<F>) -> Self
    where
        F: StyleFetcher + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let pipeline = Arc::new(pipeline);
        let shutdown = CancellationToken::new();
        let root = shutdown.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Enqueue { job_id, job } => {
                        let _ = event_tx.send(EngineEvent::Progress(JobProgress {
                            job_id,
                            stage: Stage::Queued,
                        }));
                        let pipeline = pipeline.clone();
                        let event_tx = event_tx.clone();
                        let cancel = root.child_token();
                        runtime.spawn(async move {
                            run_job(pipeline.as_ref(), job_id, job, cancel, event_tx).await;
                        });
                    }
                }
            }
        });

        Self {
            cmd_tx,
            event_rx,
            shutdown,
        }
    }

    pub fn enqueue(&self, job_id: JobId, job: ExtractionJob) {
        let _ = self.cmd_tx.send(EngineCommand::Enqueue { job_id, job });
    }

    /// Blocks until the next event; `None` once the engine has gone away.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Cancels every job in flight and any enqueued later. Their renderers
    /// are killed and their artifacts removed; each still reports
    /// `JobCompleted`.
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }
}

async fn run_job<F: StyleFetcher>(
    pipeline: &CriticalCssPipeline<F>,
    job_id: JobId,
    job: ExtractionJob,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let emit = |stage| {
        let _ = event_tx.send(EngineEvent::Progress(JobProgress { job_id, stage }));
    };

    emit(Stage::Aggregating);
    let aggregated = tokio::select! {
        result = pipeline.aggregate(&job.sources) => result.map_err(PipelineError::from),
        _ = cancel.cancelled() => Err(PipelineError::from(ExtractionError::Cancelled)),
    };

    let result = match aggregated {
        Ok(aggregation) => {
            emit(Stage::Rendering);
            pipeline.render(&job.html, aggregation, cancel).await
        }
        Err(err) => Err(err),
    };

    engine_debug!("Job {} finished: ok={}", job_id, result.is_ok());
    emit(Stage::Done);
    let _ = event_tx.send(EngineEvent::JobCompleted { job_id, result });
}
