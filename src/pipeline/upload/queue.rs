//! Upload task queue — owns pending and in-flight uploads.
//!
//! Responsibilities:
//! - validate and schedule documents, persist the task set on every mutation
//! - enforce the concurrency cap, dispatching by priority then FIFO
//! - retry retryable transport failures with exponential backoff
//! - publish an `UploadEvent` after every transition
//! - resume persisted tasks after a process restart
//!
//! All task state lives behind a single mutex and the lock is never held
//! across an await: workers drop it before network I/O and reacquire it to
//! apply the result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::transport::{AlwaysReachable, ReachabilityProbe, TransportClient, TransportRequest};

use super::error::UploadError;
use super::store::TaskStore;
use super::types::{Document, Priority, UploadConfig, UploadEvent, UploadStatus, UploadTask};

/// Capacity of the event channel. Slow subscribers lag and skip, they never
/// block the worker loop.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Body of a 2xx upload response.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadAccepted {
    job_id: String,
}

pub struct UploadQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    config: UploadConfig,
    transport: Arc<dyn TransportClient>,
    store: Arc<dyn TaskStore>,
    reachability: Arc<dyn ReachabilityProbe>,
    state: Mutex<QueueState>,
    events: broadcast::Sender<UploadEvent>,
}

struct QueueState {
    /// Active (non-terminal) tasks. Terminal tasks leave the set.
    tasks: HashMap<Uuid, UploadTask>,
    /// Cancel signal per task with a live worker. Presence here means the
    /// task holds a concurrency slot.
    cancels: HashMap<Uuid, watch::Sender<bool>>,
    active: usize,
}

impl UploadQueue {
    pub fn new(
        transport: Arc<dyn TransportClient>,
        store: Arc<dyn TaskStore>,
        config: UploadConfig,
    ) -> Self {
        Self::with_reachability(transport, store, Arc::new(AlwaysReachable), config)
    }

    pub fn with_reachability(
        transport: Arc<dyn TransportClient>,
        store: Arc<dyn TaskStore>,
        reachability: Arc<dyn ReachabilityProbe>,
        config: UploadConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(QueueInner {
                config,
                transport,
                store,
                reachability,
                state: Mutex::new(QueueState {
                    tasks: HashMap::new(),
                    cancels: HashMap::new(),
                    active: 0,
                }),
                events,
            }),
        }
    }

    /// Subscribe to task transition events. Subscribe before scheduling to
    /// observe a task's full lifecycle.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &UploadConfig {
        &self.inner.config
    }

    /// Validate and enqueue a document. Starts immediately when a concurrency
    /// slot is free and the network is reachable, otherwise stays pending.
    ///
    /// Must be called within a Tokio runtime.
    pub fn schedule(&self, document: Document, priority: Priority) -> Result<Uuid, UploadError> {
        self.inner.config.validate(&document)?;

        let task = UploadTask::new(document, priority);
        let task_id = task.id;
        let event = event_of(&task);
        {
            let mut state = self.inner.state.lock().unwrap();
            state.tasks.insert(task_id, task);
            self.inner.persist(&state);
        }
        tracing::info!(task_id = %task_id, priority = ?priority, "Upload scheduled");
        self.inner.emit(event);

        dispatch_ready(&self.inner);
        Ok(task_id)
    }

    /// Cancel a task. Aborts the in-flight transfer if any, removes the task
    /// from the persisted set. Idempotent: cancelling an unknown or
    /// already-terminal task is a no-op.
    pub fn cancel(&self, task_id: Uuid) {
        let event = {
            let mut state = self.inner.state.lock().unwrap();
            let Some(mut task) = state.tasks.remove(&task_id) else {
                return;
            };
            if state.cancels.remove(&task_id).is_some() {
                state.active -= 1;
            }
            task.status = UploadStatus::Cancelled;
            task.completed_at = Some(Utc::now());
            self.inner.persist(&state);
            event_of(&task)
        };
        tracing::info!(task_id = %task_id, "Upload cancelled");
        self.inner.emit(event);
        dispatch_ready(&self.inner);
    }

    /// Pure read of a task's current state. Terminal tasks have left the
    /// active set and read as `None`.
    pub fn status(&self, task_id: Uuid) -> Option<UploadTask> {
        self.inner.state.lock().unwrap().tasks.get(&task_id).cloned()
    }

    /// Number of tasks currently holding a concurrency slot.
    pub fn in_flight(&self) -> usize {
        self.inner.state.lock().unwrap().active
    }

    /// Re-activate tasks left pending or retrying by a previous process,
    /// up to the concurrency cap. Idempotent: tasks already known to this
    /// queue are skipped, so re-invocation never duplicates a transfer.
    pub fn resume_pending(&self) -> Result<usize, UploadError> {
        let persisted = self.inner.store.load()?;
        let mut resumed = 0;
        {
            let mut state = self.inner.state.lock().unwrap();
            for mut task in persisted {
                if task.status.is_terminal() || state.tasks.contains_key(&task.id) {
                    continue;
                }
                task.status = UploadStatus::Pending;
                state.tasks.insert(task.id, task);
                resumed += 1;
            }
            if resumed > 0 {
                self.inner.persist(&state);
            }
        }
        if resumed > 0 {
            tracing::info!(resumed, "Resumed persisted upload tasks");
        }
        dispatch_ready(&self.inner);
        Ok(resumed)
    }
}

impl QueueInner {
    /// Persist the full task set. A store failure must not abort the
    /// in-memory transition; it is logged as a consistency risk.
    fn persist(&self, state: &QueueState) {
        let tasks: Vec<UploadTask> = state.tasks.values().cloned().collect();
        if let Err(e) = self.store.save(&tasks) {
            tracing::error!(
                error = %e,
                "Failed to persist upload task set; state may not survive a restart"
            );
        }
    }

    fn emit(&self, event: UploadEvent) {
        let _ = self.events.send(event);
    }
}

fn event_of(task: &UploadTask) -> UploadEvent {
    UploadEvent {
        task_id: task.id,
        status: task.status,
        retry_count: task.retry_count,
        job_id: task.job_id.clone(),
        error: task.last_error.clone(),
        suggestion: None,
        at: Utc::now(),
    }
}

/// Fill free concurrency slots with the best pending tasks
/// (priority rank descending, then creation time ascending).
fn dispatch_ready(inner: &Arc<QueueInner>) {
    loop {
        if !inner.reachability.is_reachable() {
            return;
        }
        let (task_id, cancel_rx) = {
            let mut state = inner.state.lock().unwrap();
            if state.active >= inner.config.max_concurrent {
                return;
            }
            let next = state
                .tasks
                .values()
                .filter(|t| {
                    t.status == UploadStatus::Pending && !state.cancels.contains_key(&t.id)
                })
                .max_by(|a, b| {
                    a.priority
                        .rank()
                        .cmp(&b.priority.rank())
                        .then(b.created_at.cmp(&a.created_at))
                })
                .map(|t| t.id);
            let Some(task_id) = next else {
                return;
            };
            let (tx, rx) = watch::channel(false);
            state.cancels.insert(task_id, tx);
            state.active += 1;
            (task_id, rx)
        };
        let worker_inner = Arc::clone(inner);
        tokio::spawn(worker(worker_inner, task_id, cancel_rx));
    }
}

/// Per-task worker: attempt the upload, classify failures, retry with
/// backoff, finish in exactly one terminal transition.
async fn worker(inner: Arc<QueueInner>, task_id: Uuid, mut cancel: watch::Receiver<bool>) {
    loop {
        // pending/retrying → uploading
        let (document, attempt) = {
            let mut state = inner.state.lock().unwrap();
            let Some(task) = state.tasks.get_mut(&task_id) else {
                return; // cancelled; cancel() already released the slot
            };
            task.status = UploadStatus::Uploading;
            if task.started_at.is_none() {
                task.started_at = Some(Utc::now());
            }
            let document = task.document.clone();
            let attempt = task.retry_count + 1;
            let event = event_of(task);
            inner.persist(&state);
            inner.emit(event);
            (document, attempt)
        };

        tracing::debug!(task_id = %task_id, attempt, "Upload attempt starting");
        let request = upload_request(&inner.config, task_id, &document);
        let send = inner.transport.send(request);
        let result = tokio::select! {
            _ = cancel.changed() => {
                tracing::debug!(task_id = %task_id, "Upload aborted by cancel");
                return;
            }
            result = send => result,
        };

        match result {
            Ok(response) => {
                match response.json::<UploadAccepted>() {
                    Ok(accepted) => {
                        finish(&inner, task_id, UploadStatus::Completed, Some(accepted.job_id), None);
                    }
                    Err(e) => {
                        // 2xx with an unreadable body is not retryable.
                        let err = UploadError::BadResponse(e.to_string());
                        finish(&inner, task_id, UploadStatus::Failed, None, Some(err));
                    }
                }
                return;
            }
            Err(e) if e.is_retryable() && attempt <= inner.config.max_retries => {
                let delay = {
                    let mut state = inner.state.lock().unwrap();
                    let Some(task) = state.tasks.get_mut(&task_id) else {
                        return;
                    };
                    task.retry_count += 1;
                    task.status = UploadStatus::Retrying;
                    task.last_error = Some(e.to_string());
                    let delay = inner.config.backoff_delay(task.retry_count);
                    let event = event_of(task);
                    inner.persist(&state);
                    inner.emit(event);
                    delay
                };
                tracing::warn!(
                    task_id = %task_id,
                    error = %e,
                    retry_in_secs = delay.as_secs(),
                    "Retryable upload failure"
                );
                tokio::select! {
                    _ = cancel.changed() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                let error = if e.is_retryable() {
                    UploadError::RetriesExhausted {
                        attempts: inner.config.max_retries,
                        source: e,
                    }
                } else {
                    UploadError::Transport(e)
                };
                finish(&inner, task_id, UploadStatus::Failed, None, Some(error));
                return;
            }
        }
    }
}

/// Apply a terminal transition: release the slot, remove the task from the
/// persisted set, emit the final snapshot, then pull in the next pending task.
fn finish(
    inner: &Arc<QueueInner>,
    task_id: Uuid,
    status: UploadStatus,
    job_id: Option<String>,
    error: Option<UploadError>,
) {
    debug_assert!(status.is_terminal());
    let event = {
        let mut state = inner.state.lock().unwrap();
        let Some(mut task) = state.tasks.remove(&task_id) else {
            return; // cancelled while applying the result
        };
        if state.cancels.remove(&task_id).is_some() {
            state.active -= 1;
        }
        task.status = status;
        task.completed_at = Some(Utc::now());
        task.job_id = job_id;
        let suggestion = error.as_ref().map(|e| e.recovery_suggestion().to_string());
        if let Some(e) = error {
            task.last_error = Some(e.to_string());
        }
        inner.persist(&state);
        let mut event = event_of(&task);
        event.suggestion = suggestion;
        event
    };
    match status {
        UploadStatus::Completed => {
            tracing::info!(task_id = %task_id, job_id = ?event.job_id, "Upload completed")
        }
        _ => tracing::warn!(task_id = %task_id, error = ?event.error, "Upload failed"),
    }
    inner.emit(event);
    dispatch_ready(inner);
}

fn upload_request(config: &UploadConfig, task_id: Uuid, document: &Document) -> TransportRequest {
    let metadata = serde_json::json!({
        "taskId": task_id,
        "fileName": document.file_name,
        "mimeType": document.mime_type,
        "sizeBytes": document.size_bytes(),
    });
    TransportRequest::multipart(
        config.upload_path.clone(),
        document.file_name.clone(),
        document.mime_type.clone(),
        document.bytes.clone(),
        Some(metadata),
        config.transport_timeout,
    )
}
