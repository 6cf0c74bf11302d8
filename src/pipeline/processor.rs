//! Pipeline façade — one entry point from document to extraction result.
//!
//! `submit` routes a document through strategy selection, then either the
//! upload queue + status monitor (remote) or the on-device engine (local),
//! and republishes every stage transition on a per-task update channel.
//! Callers hold a single task id for the whole lifecycle; job ids and
//! strategy internals never leak.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::pipeline::monitor::{JobStatus, ProcessingStatus, StatusMonitor};
use crate::pipeline::routing::{
    ExtractionAttemptMetric, ExtractionResult, ExtractionRouter, RawExtraction, Strategy,
};
use crate::pipeline::upload::{Document, Priority, UploadQueue, UploadStatus, UploadTask};

/// Capacity of each task's update channel. Slow subscribers lag and skip.
const UPDATE_CHANNEL_CAPACITY: usize = 32;

/// One task lifecycle transition, as republished to façade subscribers.
#[derive(Debug, Clone)]
pub enum PipelineUpdate {
    /// Upload progress (remote tasks) or cancellation (any task).
    Upload {
        task_id: Uuid,
        status: UploadStatus,
        retry_count: u32,
        error: Option<String>,
    },
    /// Server-side processing progress for remote tasks.
    Processing {
        task_id: Uuid,
        status: ProcessingStatus,
    },
    /// Terminal success.
    Completed {
        task_id: Uuid,
        result: ExtractionResult,
    },
    /// Terminal failure, with a user-facing recovery hint.
    Failed {
        task_id: Uuid,
        message: String,
        suggestion: String,
    },
}

/// Handle returned by `submit`: the task id plus a receiver already
/// subscribed to the task's updates, so no early transition is missed.
#[derive(Debug)]
pub struct Submission {
    pub task_id: Uuid,
    pub updates: broadcast::Receiver<PipelineUpdate>,
}

pub struct DocumentPipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    queue: Arc<UploadQueue>,
    monitor: Arc<StatusMonitor>,
    router: Arc<ExtractionRouter>,
    /// Per-task update channel, removed when the task reaches a terminal
    /// update.
    subscriptions: Mutex<HashMap<Uuid, broadcast::Sender<PipelineUpdate>>>,
    /// Remote job id per task, once the upload completed.
    jobs: Mutex<HashMap<Uuid, String>>,
    /// Cancel signal per locally-running task.
    local_cancels: Mutex<HashMap<Uuid, watch::Sender<bool>>>,
}

impl DocumentPipeline {
    pub fn new(
        queue: Arc<UploadQueue>,
        monitor: Arc<StatusMonitor>,
        router: Arc<ExtractionRouter>,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                queue,
                monitor,
                router,
                subscriptions: Mutex::new(HashMap::new()),
                jobs: Mutex::new(HashMap::new()),
                local_cancels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Submit a document for extraction. Picks the strategy, starts the
    /// work, and returns immediately; progress arrives on the returned
    /// update channel.
    ///
    /// Must be called within a Tokio runtime.
    pub fn submit(
        &self,
        document: Document,
        priority: Priority,
    ) -> Result<Submission, PipelineError> {
        let strategy = self.inner.router.select_strategy(&document)?;
        match strategy {
            Strategy::Remote => self.submit_remote(document, priority),
            Strategy::Local => self.submit_local(document),
        }
    }

    fn submit_remote(
        &self,
        document: Document,
        priority: Priority,
    ) -> Result<Submission, PipelineError> {
        let document_bytes = document.size_bytes();
        // Subscribe to queue events before scheduling so the driver sees the
        // task's very first transition.
        let events = self.inner.queue.subscribe();
        let task_id = self.inner.queue.schedule(document, priority)?;

        let (updates_tx, updates_rx) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        self.inner
            .subscriptions
            .lock()
            .unwrap()
            .insert(task_id, updates_tx.clone());

        tracing::info!(task_id = %task_id, strategy = %Strategy::Remote, "Document submitted");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(drive_remote(inner, task_id, document_bytes, events, updates_tx));

        Ok(Submission {
            task_id,
            updates: updates_rx,
        })
    }

    fn submit_local(&self, document: Document) -> Result<Submission, PipelineError> {
        self.inner
            .queue
            .config()
            .validate(&document)
            .map_err(PipelineError::Upload)?;
        let task_id = Uuid::new_v4();

        let (updates_tx, updates_rx) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        {
            self.inner
                .subscriptions
                .lock()
                .unwrap()
                .insert(task_id, updates_tx.clone());
            self.inner
                .local_cancels
                .lock()
                .unwrap()
                .insert(task_id, cancel_tx);
        }

        tracing::info!(task_id = %task_id, strategy = %Strategy::Local, "Document submitted");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(drive_local(inner, task_id, document, updates_tx, cancel_rx));

        Ok(Submission {
            task_id,
            updates: updates_rx,
        })
    }

    /// Additional update receiver for an in-progress task. `None` once the
    /// task has reached a terminal update.
    pub fn subscribe(&self, task_id: Uuid) -> Option<broadcast::Receiver<PipelineUpdate>> {
        self.inner
            .subscriptions
            .lock()
            .unwrap()
            .get(&task_id)
            .map(|tx| tx.subscribe())
    }

    /// Cancel a task wherever it currently is: queued or transferring,
    /// processing remotely, or extracting locally. Idempotent.
    pub fn cancel(&self, task_id: Uuid) {
        self.inner.queue.cancel(task_id);
        if let Some(job_id) = self.inner.jobs.lock().unwrap().get(&task_id).cloned() {
            self.inner.monitor.stop(&job_id);
        }
        if let Some(cancel_tx) = self.inner.local_cancels.lock().unwrap().get(&task_id) {
            let _ = cancel_tx.send(true);
        }
    }

    /// Upload-side state of a remote task. `None` for local tasks and for
    /// tasks past the upload phase.
    pub fn upload_status(&self, task_id: Uuid) -> Option<UploadTask> {
        self.inner.queue.status(task_id)
    }
}

// ═══════════════════════════════════════════
// Drivers
// ═══════════════════════════════════════════

/// Follow a remote task: forward upload events, hand off to the status
/// monitor once the transfer lands, assemble and publish the final result.
async fn drive_remote(
    inner: Arc<PipelineInner>,
    task_id: Uuid,
    document_bytes: u64,
    mut events: broadcast::Receiver<crate::pipeline::upload::UploadEvent>,
    updates: broadcast::Sender<PipelineUpdate>,
) {
    let started = Instant::now();

    let job_id = loop {
        match events.recv().await {
            Ok(ev) if ev.task_id == task_id => {
                let status = ev.status;
                let job_id = ev.job_id.clone();
                let error = ev.error.clone();
                let suggestion = ev.suggestion.clone();
                let _ = updates.send(PipelineUpdate::Upload {
                    task_id,
                    status,
                    retry_count: ev.retry_count,
                    error: ev.error,
                });
                match status {
                    UploadStatus::Completed => match job_id {
                        Some(job_id) => break job_id,
                        None => {
                            // Queue guarantees a job id on completion; treat
                            // absence as a failed attempt.
                            record_failure(&inner, Strategy::Remote, document_bytes, &started);
                            finish(&inner, task_id);
                            return;
                        }
                    },
                    UploadStatus::Failed => {
                        record_failure(&inner, Strategy::Remote, document_bytes, &started);
                        let _ = updates.send(PipelineUpdate::Failed {
                            task_id,
                            message: error.unwrap_or_else(|| "upload failed".to_string()),
                            suggestion: suggestion.unwrap_or_else(|| {
                                "Try uploading the document again.".to_string()
                            }),
                        });
                        finish(&inner, task_id);
                        return;
                    }
                    UploadStatus::Cancelled => {
                        finish(&inner, task_id);
                        return;
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(task_id = %task_id, skipped, "Upload event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => {
                finish(&inner, task_id);
                return;
            }
        }
    };

    inner.jobs.lock().unwrap().insert(task_id, job_id.clone());
    let mut statuses = inner.monitor.observe(&job_id);
    while let Some(observed) = statuses.recv().await {
        match observed {
            Ok(status) => {
                let job_status = status.status;
                let result = status.result.clone();
                let error_message = status.error_message.clone();
                let _ = updates.send(PipelineUpdate::Processing { task_id, status });
                if !job_status.is_terminal() {
                    continue;
                }
                match (job_status, result) {
                    (JobStatus::Completed, Some(job_result)) => {
                        let raw = RawExtraction {
                            text: job_result.text,
                            entities: if job_result.entities.is_empty() {
                                None
                            } else {
                                Some(job_result.entities)
                            },
                            confidence: job_result.confidence.unwrap_or(0.0),
                        };
                        let extraction = inner.router.assemble(Strategy::Remote, raw);
                        inner.router.record_outcome(ExtractionAttemptMetric::success(
                            Strategy::Remote,
                            document_bytes,
                            elapsed_ms(&started),
                            &extraction,
                        ));
                        tracing::info!(
                            task_id = %task_id,
                            entities = extraction.entities.len(),
                            "Extraction completed"
                        );
                        let _ = updates.send(PipelineUpdate::Completed {
                            task_id,
                            result: extraction,
                        });
                    }
                    (JobStatus::Completed, None) => {
                        record_failure(&inner, Strategy::Remote, document_bytes, &started);
                        let _ = updates.send(PipelineUpdate::Failed {
                            task_id,
                            message: "processing completed without a result".to_string(),
                            suggestion: "Try uploading the document again.".to_string(),
                        });
                    }
                    (JobStatus::Failed, _) => {
                        record_failure(&inner, Strategy::Remote, document_bytes, &started);
                        let message = error_message
                            .unwrap_or_else(|| "processing failed".to_string());
                        let _ = updates.send(PipelineUpdate::Failed {
                            task_id,
                            message,
                            suggestion: "The analysis service had trouble with this document. Try again."
                                .to_string(),
                        });
                    }
                    (JobStatus::Cancelled, _) => {}
                    _ => {}
                }
                break;
            }
            Err(e) => {
                record_failure(&inner, Strategy::Remote, document_bytes, &started);
                let suggestion = e.recovery_suggestion().to_string();
                let _ = updates.send(PipelineUpdate::Failed {
                    task_id,
                    message: e.to_string(),
                    suggestion,
                });
                break;
            }
        }
    }
    finish(&inner, task_id);
}

/// Run the on-device engine for a task, honouring cancellation.
async fn drive_local(
    inner: Arc<PipelineInner>,
    task_id: Uuid,
    document: Document,
    updates: broadcast::Sender<PipelineUpdate>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let started = Instant::now();
    let document_bytes = document.size_bytes();

    let outcome = tokio::select! {
        _ = cancel_rx.changed() => None,
        result = inner.router.execute(&document, Strategy::Local) => Some(result),
    };
    match outcome {
        None => {
            tracing::info!(task_id = %task_id, "Local extraction cancelled");
            let _ = updates.send(PipelineUpdate::Upload {
                task_id,
                status: UploadStatus::Cancelled,
                retry_count: 0,
                error: None,
            });
        }
        Some(Ok(result)) => {
            inner.router.record_outcome(ExtractionAttemptMetric::success(
                result.strategy,
                document_bytes,
                elapsed_ms(&started),
                &result,
            ));
            tracing::info!(
                task_id = %task_id,
                entities = result.entities.len(),
                "Extraction completed"
            );
            let _ = updates.send(PipelineUpdate::Completed { task_id, result });
        }
        Some(Err(e)) => {
            record_failure(&inner, Strategy::Local, document_bytes, &started);
            let suggestion = e.recovery_suggestion().to_string();
            let _ = updates.send(PipelineUpdate::Failed {
                task_id,
                message: e.to_string(),
                suggestion,
            });
        }
    }
    finish(&inner, task_id);
}

fn record_failure(
    inner: &PipelineInner,
    strategy: Strategy,
    document_bytes: u64,
    started: &Instant,
) {
    inner.router.record_outcome(ExtractionAttemptMetric::failure(
        strategy,
        document_bytes,
        elapsed_ms(started),
    ));
}

fn elapsed_ms(started: &Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

/// Drop the task's bookkeeping. Update receivers still drain anything
/// buffered before the sender went away.
fn finish(inner: &PipelineInner, task_id: Uuid) {
    inner.subscriptions.lock().unwrap().remove(&task_id);
    inner.local_cancels.lock().unwrap().remove(&task_id);
    inner.jobs.lock().unwrap().remove(&task_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::pipeline::monitor::MonitorConfig;
    use crate::pipeline::routing::{LocalExtractionEngine, RouterConfig, RouterError};
    use crate::pipeline::upload::{MemoryStore, UploadConfig};
    use crate::transport::{
        ReachabilityProbe, TransportClient, TransportError, TransportRequest, TransportResponse,
    };

    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(
            responses: impl IntoIterator<Item = Result<TransportResponse, TransportError>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicUsize::new(0),
            })
        }

        fn ok(status: u16, body: &str) -> Result<TransportResponse, TransportError> {
            Ok(TransportResponse {
                status,
                body: body.as_bytes().to_vec(),
            })
        }
    }

    #[async_trait]
    impl TransportClient for ScriptedTransport {
        async fn send(
            &self,
            _request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            match responses.pop_front() {
                Some(r) => r,
                None => Err(TransportError::NotConnected),
            }
        }
    }

    struct SlowLocal;

    #[async_trait]
    impl LocalExtractionEngine for SlowLocal {
        async fn extract(&self, _document: &Document) -> Result<RawExtraction, RouterError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("extraction should be cancelled first")
        }
    }

    struct InstantLocal;

    #[async_trait]
    impl LocalExtractionEngine for InstantLocal {
        async fn extract(&self, _document: &Document) -> Result<RawExtraction, RouterError> {
            Ok(RawExtraction {
                text: "Glucose 98 mg/dL ref: 70-100".to_string(),
                entities: None,
                confidence: 0.7,
            })
        }
    }

    struct Offline;

    impl ReachabilityProbe for Offline {
        fn is_reachable(&self) -> bool {
            false
        }
    }

    fn remote_router(
        remote_transport: Arc<dyn TransportClient>,
        local: Option<Arc<dyn LocalExtractionEngine>>,
    ) -> Arc<ExtractionRouter> {
        Arc::new(ExtractionRouter::new(
            Arc::new(TransportRemote {
                transport: remote_transport,
            }),
            local,
            RouterConfig::default(),
        ))
    }

    // The façade's remote path goes through queue + monitor, never through
    // the router's remote backend. This stub keeps construction honest.
    struct TransportRemote {
        #[allow(dead_code)]
        transport: Arc<dyn TransportClient>,
    }

    #[async_trait]
    impl crate::pipeline::routing::RemoteExtraction for TransportRemote {
        async fn extract(&self, _document: &Document) -> Result<RawExtraction, RouterError> {
            Err(RouterError::Remote("not used by the pipeline".into()))
        }
    }

    fn pipeline(
        upload_transport: Arc<ScriptedTransport>,
        status_transport: Arc<ScriptedTransport>,
        router: Arc<ExtractionRouter>,
    ) -> DocumentPipeline {
        let queue = Arc::new(UploadQueue::new(
            upload_transport,
            Arc::new(MemoryStore::default()),
            UploadConfig::default(),
        ));
        let monitor = Arc::new(StatusMonitor::new(
            status_transport,
            MonitorConfig::default(),
        ));
        DocumentPipeline::new(queue, monitor, router)
    }

    fn small_pdf() -> Document {
        Document::new("labs.pdf", "application/pdf", vec![1, 2, 3])
    }

    async fn collect_until_terminal(
        updates: &mut broadcast::Receiver<PipelineUpdate>,
    ) -> Vec<PipelineUpdate> {
        let mut seen = Vec::new();
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let terminal = matches!(
                        update,
                        PipelineUpdate::Completed { .. }
                            | PipelineUpdate::Failed { .. }
                            | PipelineUpdate::Upload {
                                status: UploadStatus::Cancelled,
                                ..
                            }
                    );
                    seen.push(update);
                    if terminal {
                        return seen;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return seen,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn remote_happy_path_publishes_upload_processing_then_result() {
        let upload = ScriptedTransport::new([ScriptedTransport::ok(
            200,
            r#"{"jobId": "job-1"}"#,
        )]);
        let status = ScriptedTransport::new([
            ScriptedTransport::ok(
                200,
                r#"{"status": "processing", "stage": "ocr", "progress": 0.4}"#,
            ),
            ScriptedTransport::ok(
                200,
                r#"{
                    "status": "completed",
                    "stage": "finalizing",
                    "progress": 1.0,
                    "result": {
                        "text": "Hemoglobin: 13.5 g/dL (12.0 - 15.5)",
                        "confidence": 0.93
                    }
                }"#,
            ),
        ]);
        let router = remote_router(upload.clone(), None);
        let pipeline = pipeline(upload, status, router.clone());

        let mut submission = pipeline.submit(small_pdf(), Priority::Normal).unwrap();
        let updates = collect_until_terminal(&mut submission.updates).await;

        assert!(updates.iter().any(|u| matches!(
            u,
            PipelineUpdate::Upload { status: UploadStatus::Uploading, .. }
        )));
        assert!(updates.iter().any(|u| matches!(
            u,
            PipelineUpdate::Upload { status: UploadStatus::Completed, .. }
        )));
        assert!(updates.iter().any(|u| matches!(
            u,
            PipelineUpdate::Processing { status, .. } if status.status == JobStatus::Processing
        )));
        let Some(PipelineUpdate::Completed { result, .. }) = updates.last() else {
            panic!("expected a completed update, got {:?}", updates.last());
        };
        assert_eq!(result.strategy, Strategy::Remote);
        // Entities were derived from the result text since the server sent none.
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "Hemoglobin");
        assert_eq!(router.consecutive_failures(Strategy::Remote), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_submission_runs_the_local_engine() {
        let upload = ScriptedTransport::new([]);
        let status = ScriptedTransport::new([]);
        let router = Arc::new(ExtractionRouter::with_reachability(
            Arc::new(TransportRemote {
                transport: upload.clone() as Arc<dyn TransportClient>,
            }),
            Some(Arc::new(InstantLocal)),
            Arc::new(Offline),
            RouterConfig::default(),
        ));
        let pipeline = pipeline(upload.clone(), status.clone(), router);

        let mut submission = pipeline.submit(small_pdf(), Priority::Normal).unwrap();
        let updates = collect_until_terminal(&mut submission.updates).await;

        let Some(PipelineUpdate::Completed { result, .. }) = updates.last() else {
            panic!("expected a completed update, got {:?}", updates.last());
        };
        assert_eq!(result.strategy, Strategy::Local);
        assert_eq!(result.entities[0].name, "Glucose");
        // Nothing touched the network.
        assert_eq!(upload.calls.load(Ordering::SeqCst), 0);
        assert_eq!(status.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_processing_publishes_failure_and_records_the_outcome() {
        let upload = ScriptedTransport::new([ScriptedTransport::ok(
            200,
            r#"{"jobId": "job-2"}"#,
        )]);
        let status = ScriptedTransport::new([ScriptedTransport::ok(
            200,
            r#"{"status": "failed", "errorMessage": "unreadable scan"}"#,
        )]);
        let router = remote_router(upload.clone(), None);
        let pipeline = pipeline(upload, status, router.clone());

        let mut submission = pipeline.submit(small_pdf(), Priority::Normal).unwrap();
        let updates = collect_until_terminal(&mut submission.updates).await;

        assert!(matches!(
            updates.last(),
            Some(PipelineUpdate::Failed { suggestion, .. }) if !suggestion.is_empty()
        ));
        assert_eq!(router.consecutive_failures(Strategy::Remote), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_a_local_task_stops_the_engine() {
        let upload = ScriptedTransport::new([]);
        let status = ScriptedTransport::new([]);
        let router = Arc::new(ExtractionRouter::with_reachability(
            Arc::new(TransportRemote {
                transport: upload.clone() as Arc<dyn TransportClient>,
            }),
            Some(Arc::new(SlowLocal)),
            Arc::new(Offline),
            RouterConfig::default(),
        ));
        let pipeline = pipeline(upload, status, router);

        let mut submission = pipeline.submit(small_pdf(), Priority::Normal).unwrap();
        tokio::task::yield_now().await;
        pipeline.cancel(submission.task_id);

        let updates = collect_until_terminal(&mut submission.updates).await;
        assert!(matches!(
            updates.last(),
            Some(PipelineUpdate::Upload {
                status: UploadStatus::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn upload_failure_surfaces_without_reaching_the_monitor() {
        let upload = ScriptedTransport::new([Err(TransportError::from_status(
            422,
            "unsupported document".into(),
        ))]);
        let status = ScriptedTransport::new([]);
        let router = remote_router(upload.clone(), None);
        let pipeline = pipeline(upload, status.clone(), router.clone());

        let mut submission = pipeline.submit(small_pdf(), Priority::Normal).unwrap();
        let updates = collect_until_terminal(&mut submission.updates).await;

        assert!(updates.iter().any(|u| matches!(
            u,
            PipelineUpdate::Upload {
                status: UploadStatus::Failed,
                error: Some(_),
                ..
            }
        )));
        // The stream ends with a user-facing failure carrying a recovery hint.
        let Some(PipelineUpdate::Failed { message, suggestion, .. }) = updates.last() else {
            panic!("expected a failed update, got {:?}", updates.last());
        };
        assert!(message.contains("422"));
        assert!(!suggestion.is_empty());
        assert_eq!(status.calls.load(Ordering::SeqCst), 0);
        assert_eq!(router.consecutive_failures(Strategy::Remote), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_document_is_rejected_synchronously() {
        let upload = ScriptedTransport::new([]);
        let status = ScriptedTransport::new([]);
        let router = remote_router(upload.clone(), None);
        let pipeline = pipeline(upload.clone(), status, router);

        let huge = Document::new("scan.pdf", "application/pdf", vec![0u8; 12 * 1024 * 1024]);
        let err = pipeline.submit(huge, Priority::Normal).unwrap_err();
        assert!(matches!(err, PipelineError::Upload(_)));
        assert_eq!(upload.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn late_subscribers_can_attach_while_the_task_runs() {
        let upload = ScriptedTransport::new([]);
        let status = ScriptedTransport::new([]);
        let router = Arc::new(ExtractionRouter::with_reachability(
            Arc::new(TransportRemote {
                transport: upload.clone() as Arc<dyn TransportClient>,
            }),
            Some(Arc::new(SlowLocal)),
            Arc::new(Offline),
            RouterConfig::default(),
        ));
        let pipeline = pipeline(upload, status, router);

        let submission = pipeline.submit(small_pdf(), Priority::Normal).unwrap();
        assert!(pipeline.subscribe(submission.task_id).is_some());
        assert!(pipeline.subscribe(Uuid::new_v4()).is_none());
        pipeline.cancel(submission.task_id);
    }
}
